// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote key-value store with conditional writes and pub/sub

mod redis;

pub use self::redis::RedisStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStore, StoreCall, StoreOp};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("subscription stream closed")]
    StreamClosed,
}

/// Result of a compare-and-delete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record held the expected value and was removed
    Deleted,
    /// No record existed
    Absent,
    /// A record exists with a different value; left untouched
    Mismatch,
}

/// Messages received on a subscribed channel; ends when the subscription drops
pub type ReleaseStream = BoxStream<'static, Result<String, StoreError>>;

/// Minimal store surface the lock coordinator depends on
#[async_trait]
pub trait LockStore: Clone + Send + Sync + 'static {
    /// `SET key value NX PX ttl`; true when the record was written
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, StoreError>;

    /// `DEL key`; true when a record was removed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically delete `key` only if it currently holds `value`
    async fn delete_if_equals(&self, key: &str, value: &str)
        -> Result<DeleteOutcome, StoreError>;

    /// Fire-and-forget broadcast
    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError>;

    /// Open a long-lived subscription to `channel`
    async fn subscribe(&self, channel: &str) -> Result<ReleaseStream, StoreError>;
}
