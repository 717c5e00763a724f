// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking, wakeable lock on top of a store's conditional write
//!
//! Acquisition tries `SET NX` first. On a miss the caller registers in the
//! waiter registry and blocks until a release notification is handed to it,
//! the wait timeout elapses, or it is cancelled. A woken caller retries the
//! write exactly once; there is no fairness between waiters.

use crate::error::LockError;
use crate::registry::WaiterRegistry;
use crate::subscriber::{ReleaseSubscriber, SubscriberState};
use lk_adapters::{DeleteOutcome, LockStore};
use lk_core::{CoordinatorConfig, LockMetrics, MetricsSnapshot, ReleaseMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Distributed lock coordinator bound to one store and one release channel
///
/// Coordinators never share state; each owns its registry, counters and
/// subscriber task.
pub struct LockCoordinator<S: LockStore> {
    store: S,
    config: CoordinatorConfig,
    registry: WaiterRegistry,
    metrics: Arc<LockMetrics>,
    shutdown: CancellationToken,
    subscriber: Mutex<Option<JoinHandle<Result<(), LockError>>>>,
    subscriber_state: watch::Receiver<SubscriberState>,
}

impl<S: LockStore> LockCoordinator<S> {
    /// Validate `config`, start the release subscriber and wait for it to
    /// settle
    ///
    /// A subscriber that fails to start is logged, not returned: the
    /// coordinator still works, with waiters bounded by `wait_timeout`.
    pub async fn start(store: S, config: CoordinatorConfig) -> Result<Self, LockError> {
        config.validate()?;

        let metrics = Arc::new(LockMetrics::new());
        let registry = WaiterRegistry::new(Arc::clone(&metrics));
        let shutdown = CancellationToken::new();
        let (handle, mut subscriber_state) = ReleaseSubscriber::spawn(
            store.clone(),
            config.channel.clone(),
            registry.clone(),
            shutdown.clone(),
        );

        let settled = subscriber_state
            .wait_for(|s| *s != SubscriberState::Starting)
            .await
            .map(|s| s.clone());
        if let Ok(SubscriberState::Failed(reason)) = settled {
            tracing::warn!(
                channel = %config.channel,
                reason = %reason,
                "starting without release notifications"
            );
        }

        tracing::info!(
            key_prefix = %config.key_prefix,
            channel = %config.channel,
            wait_timeout_ms = config.wait_timeout.as_millis() as u64,
            retry = config.retry,
            "lock coordinator started"
        );

        Ok(Self {
            store,
            config,
            registry,
            metrics,
            shutdown,
            subscriber: Mutex::new(Some(handle)),
            subscriber_state,
        })
    }

    /// Acquire `key` for `token` with the configured default expiry
    pub async fn lock(&self, key: &str, token: &str) -> Result<(), LockError> {
        self.lock_with_expiry(key, token, self.config.default_expiry)
            .await
    }

    /// Acquire `key` for `token`; the record expires after `expiry`
    pub async fn lock_with_expiry(
        &self,
        key: &str,
        token: &str,
        expiry: Duration,
    ) -> Result<(), LockError> {
        self.lock_with_cancel(key, token, expiry, &CancellationToken::new())
            .await
    }

    /// Acquire `key` for `token`, giving up with `Cancelled` when `cancel` fires
    pub async fn lock_with_cancel(
        &self,
        key: &str,
        token: &str,
        expiry: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), LockError> {
        if self.shutdown.is_cancelled() {
            return Err(LockError::Closed);
        }
        let qualified = self.config.qualify(key);

        if self.config.retry == 0 {
            return self.attempt(&qualified, token, expiry, cancel).await;
        }

        let mut attempt = 1;
        loop {
            let err = match self.attempt(&qualified, token, expiry, cancel).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= self.config.retry {
                return Err(LockError::RetryExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            tracing::debug!(key = %qualified, attempt, error = %err, "acquisition attempt failed, retrying");
            attempt += 1;
        }
    }

    /// Release `key`, then notify every coordinator on the channel
    pub async fn unlock(&self, key: &str, token: &str) -> Result<(), LockError> {
        let qualified = self.config.qualify(key);

        match self.config.release_mode {
            ReleaseMode::OwnerChecked => {
                match self.store.delete_if_equals(&qualified, token).await? {
                    DeleteOutcome::Deleted => {}
                    DeleteOutcome::Absent => {
                        tracing::debug!(key = %qualified, "no record to release, notifying anyway")
                    }
                    DeleteOutcome::Mismatch => {
                        return Err(LockError::NotOwner { key: qualified });
                    }
                }
            }
            ReleaseMode::Unconditional => {
                if !self.store.delete(&qualified).await? {
                    tracing::debug!(key = %qualified, "no record to release, notifying anyway");
                }
            }
        }

        if let Err(e) = self.store.publish(&self.config.channel, &qualified).await {
            tracing::warn!(
                key = %qualified,
                error = %e,
                "lock released but not announced, remote waiters fall back to their timeout"
            );
            return Err(e.into());
        }

        self.metrics.incr_unlocked();
        Ok(())
    }

    /// Stop the release subscriber and wait for it to finish
    ///
    /// No release is delivered after this returns. Pending and future lock
    /// calls fail with `Closed`. Returns the subscriber's failure, if it had
    /// one; calling again is a no-op.
    pub async fn close(&self) -> Result<(), LockError> {
        self.shutdown.cancel();

        // Held until the task is joined so concurrent callers return only
        // after the subscriber has stopped
        let mut subscriber = self.subscriber.lock().await;
        let Some(handle) = subscriber.take() else {
            return Ok(());
        };
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(LockError::SubscribeFailure(format!(
                "subscriber task aborted: {}",
                e
            ))),
        };

        if let Err(e) = &result {
            tracing::warn!(error = %e, "release subscriber ended with an error");
        }
        tracing::info!(metrics = %self.metrics.snapshot(), "lock coordinator closed");
        result
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn subscriber_state(&self) -> SubscriberState {
        self.subscriber_state.borrow().clone()
    }

    /// Qualified keys with local callers currently blocked on them
    pub fn waiting_keys(&self) -> Vec<String> {
        self.registry.keys()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// One full acquisition attempt: fast path, wait, single retry
    async fn attempt(
        &self,
        key: &str,
        token: &str,
        expiry: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), LockError> {
        if self.try_write(key, token, expiry, cancel).await? {
            self.metrics.incr_locked();
            return Ok(());
        }

        let waiter = self.registry.acquire(key);
        // A release published between the miss and the registration above
        // would otherwise go unseen until the timeout
        if self.try_write(key, token, expiry, cancel).await? {
            self.metrics.incr_locked();
            return Ok(());
        }

        tracing::debug!(key, "lock held elsewhere, waiting for release");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LockError::Cancelled),
            _ = self.shutdown.cancelled() => return Err(LockError::Closed),
            _ = tokio::time::sleep(self.config.wait_timeout) => {
                return Err(LockError::Timeout(self.config.wait_timeout));
            }
            wake = waiter.wait() => tracing::debug!(key, ?wake, "woken"),
        }
        drop(waiter);

        if self.try_write(key, token, expiry, cancel).await? {
            self.metrics.incr_locked();
            Ok(())
        } else {
            Err(LockError::Contended {
                key: key.to_string(),
            })
        }
    }

    /// Conditional write raced against cancellation and shutdown
    async fn try_write(
        &self,
        key: &str,
        token: &str,
        expiry: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, LockError> {
        let interrupted = tokio::select! {
            biased;
            _ = cancel.cancelled() => LockError::Cancelled,
            _ = self.shutdown.cancelled() => LockError::Closed,
            written = self.store.set_if_absent(key, token, expiry) => return Ok(written?),
        };

        // The abandoned write may already have reached the store
        match self.store.delete_if_equals(key, token).await {
            Ok(DeleteOutcome::Deleted) => {
                tracing::debug!(key, "removed record written by an interrupted acquisition")
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(
                key,
                error = %e,
                "could not clear interrupted acquisition, record lives until expiry"
            ),
        }
        Err(interrupted)
    }
}

impl<S: LockStore> Drop for LockCoordinator<S> {
    fn drop(&mut self) {
        // Let the subscriber task exit even if close() was never awaited
        self.shutdown.cancel();
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
