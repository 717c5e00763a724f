// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::store::{DeleteOutcome, LockStore, ReleaseStream, StoreError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any LockStore
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LockStore> LockStore for TracedStore<S> {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let span = tracing::debug_span!("store.set_nx", key, ttl_ms = ttl.as_millis() as u64);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.set_if_absent(key, value, ttl).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(written) => tracing::debug!(written, elapsed_ms, "conditional write"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "conditional write failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let span = tracing::debug_span!("store.del", key);
        async {
            let result = self.inner.delete(key).await;
            match &result {
                Ok(existed) => tracing::debug!(existed, "deleted"),
                Err(e) => tracing::error!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<DeleteOutcome, StoreError> {
        let span = tracing::debug_span!("store.del_if_eq", key);
        async {
            let result = self.inner.delete_if_equals(key, value).await;
            match &result {
                Ok(DeleteOutcome::Mismatch) => {
                    tracing::warn!("record held by another owner, not deleted")
                }
                Ok(outcome) => tracing::debug!(?outcome, "compare-and-delete"),
                Err(e) => tracing::error!(error = %e, "compare-and-delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        let span = tracing::debug_span!("store.publish", channel, message);
        async {
            let result = self.inner.publish(channel, message).await;
            match &result {
                Ok(()) => tracing::debug!("published"),
                Err(e) => tracing::error!(error = %e, "publish failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn subscribe(&self, channel: &str) -> Result<ReleaseStream, StoreError> {
        let span = tracing::info_span!("store.subscribe", channel);
        async {
            let result = self.inner.subscribe(channel).await;
            match &result {
                Ok(_) => tracing::info!("subscribed"),
                Err(e) => tracing::error!(error = %e, "subscribe failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
