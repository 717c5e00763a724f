// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis / Valkey store adapter

use super::{DeleteOutcome, LockStore, ReleaseStream, StoreError};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use std::sync::Arc;
use std::time::Duration;

/// Compare-and-delete: 1 deleted, 0 absent, -1 held by another value
const RELEASE_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
if current == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return 1
end
return -1
"#;

/// Store adapter backed by a Redis-protocol server
///
/// Commands share one multiplexed connection; each subscription opens its
/// own dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    conn: MultiplexedConnection,
    release_script: Arc<Script>,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(connection_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_err)?;

        Ok(Self {
            client,
            conn,
            release_script: Arc::new(Script::new(RELEASE_SCRIPT)),
        })
    }
}

fn connection_err(e: redis::RedisError) -> StoreError {
    StoreError::Connection(e.to_string())
}

fn command_err(e: redis::RedisError) -> StoreError {
    if e.is_connection_dropped() || e.is_io_error() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

/// Millisecond expiry for `PX`; the server rejects zero
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl LockStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        // Nil reply when NX refuses the write
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_err)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_err)?;
        Ok(removed > 0)
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<DeleteOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let outcome: i64 = self
            .release_script
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(command_err)?;

        match outcome {
            1 => Ok(DeleteOutcome::Deleted),
            0 => Ok(DeleteOutcome::Absent),
            -1 => Ok(DeleteOutcome::Mismatch),
            other => Err(StoreError::Command(format!(
                "unexpected release script reply: {}",
                other
            ))),
        }
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async(&mut conn)
            .await
            .map_err(command_err)?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<ReleaseStream, StoreError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(connection_err)?;
        pubsub.subscribe(channel).await.map_err(command_err)?;

        let stream = pubsub.into_on_message().map(|msg| {
            msg.get_payload::<String>()
                .map_err(|e| StoreError::Command(format!("undecodable payload: {}", e)))
        });
        Ok(stream.boxed())
    }
}
