// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background task fanning release notifications into the waiter registry

use crate::error::LockError;
use crate::registry::WaiterRegistry;
use futures::StreamExt;
use lk_adapters::{LockStore, StoreError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of the release subscriber
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriberState {
    Starting,
    Subscribed,
    /// Shut down by its owner
    Cancelled,
    /// Ended abnormally; lock calls fall back to timeout-only waiting
    Failed(String),
}

/// One subscription to the shared release channel
pub(crate) struct ReleaseSubscriber<S> {
    store: S,
    channel: String,
    registry: WaiterRegistry,
    shutdown: CancellationToken,
    state: watch::Sender<SubscriberState>,
}

impl<S: LockStore> ReleaseSubscriber<S> {
    /// Spawn the subscriber; it runs until `shutdown` fires or the stream fails
    pub(crate) fn spawn(
        store: S,
        channel: String,
        registry: WaiterRegistry,
        shutdown: CancellationToken,
    ) -> (
        JoinHandle<Result<(), LockError>>,
        watch::Receiver<SubscriberState>,
    ) {
        let (state, state_rx) = watch::channel(SubscriberState::Starting);
        let subscriber = Self {
            store,
            channel,
            registry,
            shutdown,
            state,
        };
        (tokio::spawn(subscriber.run()), state_rx)
    }

    async fn run(self) -> Result<(), LockError> {
        let subscribed = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                self.cancelled();
                return Ok(());
            }
            result = self.store.subscribe(&self.channel) => result,
        };

        let mut releases = match subscribed {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };
        self.state.send_replace(SubscriberState::Subscribed);
        tracing::info!(channel = %self.channel, "release subscriber listening");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    self.cancelled();
                    return Ok(());
                }
                next = releases.next() => next,
            };

            match next {
                Some(Ok(key)) => {
                    self.registry.signal(&key);
                }
                Some(Err(e)) => {
                    tracing::warn!(channel = %self.channel, error = %e, "skipping undeliverable release message");
                }
                None => return Err(self.fail(StoreError::StreamClosed)),
            }
        }
    }

    fn cancelled(&self) {
        tracing::debug!(channel = %self.channel, "release subscriber cancelled");
        self.state.send_replace(SubscriberState::Cancelled);
    }

    fn fail(&self, cause: StoreError) -> LockError {
        tracing::error!(
            channel = %self.channel,
            error = %cause,
            "release subscriber failed, waiters will rely on timeouts"
        );
        self.state
            .send_replace(SubscriberState::Failed(cause.to_string()));
        LockError::SubscribeFailure(cause.to_string())
    }
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod tests;
