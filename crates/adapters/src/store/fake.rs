// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for testing
//!
//! Clones share state, so several coordinators built on clones of one
//! `FakeStore` behave like processes sharing a server.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DeleteOutcome, LockStore, ReleaseStream, StoreError};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const BUS_CAPACITY: usize = 1024;

/// Store operation kinds, used for failure injection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    SetIfAbsent,
    Delete,
    DeleteIfEquals,
    Publish,
    Subscribe,
}

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    SetIfAbsent {
        key: String,
        value: String,
        ttl: Duration,
        written: bool,
    },
    Delete {
        key: String,
    },
    DeleteIfEquals {
        key: String,
        value: String,
    },
    Publish {
        channel: String,
        message: String,
    },
    Subscribe {
        channel: String,
    },
}

struct FakeRecord {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
struct FakeState {
    records: HashMap<String, FakeRecord>,
    calls: Vec<StoreCall>,
    failing: HashSet<StoreOp>,
    latency: Option<Duration>,
}

impl FakeState {
    fn live_record(&mut self, key: &str) -> Option<&FakeRecord> {
        let expired = self
            .records
            .get(key)
            .is_some_and(|r| r.expires_at <= Instant::now());
        if expired {
            self.records.remove(key);
        }
        self.records.get(key)
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.contains(&op) {
            return Err(StoreError::Command(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

/// Fake lock store with TTL, compare-and-delete and broadcast pub/sub
#[derive(Clone)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
    bus: broadcast::Sender<(String, String)>,
    disconnect: Arc<Mutex<CancellationToken>>,
}

impl Default for FakeStore {
    fn default() -> Self {
        let (bus, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            bus,
            disconnect: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock_state().calls.clone()
    }

    /// Count recorded publishes to `channel`
    pub fn publish_count(&self, channel: &str) -> usize {
        self.lock_state()
            .calls
            .iter()
            .filter(|c| matches!(c, StoreCall::Publish { channel: ch, .. } if ch == channel))
            .count()
    }

    /// Current (unexpired) value stored at `key`
    pub fn value(&self, key: &str) -> Option<String> {
        self.lock_state().live_record(key).map(|r| r.value.clone())
    }

    /// Seed a record directly, bypassing NX
    pub fn insert(&self, key: &str, value: &str, ttl: Duration) {
        self.lock_state().records.insert(
            key.to_string(),
            FakeRecord {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Make every future call of `op` fail until cleared
    pub fn fail(&self, op: StoreOp) {
        self.lock_state().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.lock_state().failing.clear();
    }

    /// Delay every command by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.lock_state().latency = Some(latency);
    }

    /// End every open subscription stream, as if the server dropped them
    pub fn disconnect_subscribers(&self) {
        let mut token = self.disconnect.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
    }

    async fn simulate_latency(&self) {
        let latency = self.lock_state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl LockStore for FakeStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.simulate_latency().await;
        let mut state = self.lock_state();
        state.check(StoreOp::SetIfAbsent)?;

        let written = state.live_record(key).is_none();
        if written {
            state.records.insert(
                key.to_string(),
                FakeRecord {
                    value: value.to_string(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        state.calls.push(StoreCall::SetIfAbsent {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
            written,
        });
        Ok(written)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.simulate_latency().await;
        let mut state = self.lock_state();
        state.check(StoreOp::Delete)?;
        state.calls.push(StoreCall::Delete {
            key: key.to_string(),
        });

        let existed = state.live_record(key).is_some();
        state.records.remove(key);
        Ok(existed)
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<DeleteOutcome, StoreError> {
        self.simulate_latency().await;
        let mut state = self.lock_state();
        state.check(StoreOp::DeleteIfEquals)?;
        state.calls.push(StoreCall::DeleteIfEquals {
            key: key.to_string(),
            value: value.to_string(),
        });

        let outcome = match state.live_record(key) {
            None => DeleteOutcome::Absent,
            Some(r) if r.value == value => DeleteOutcome::Deleted,
            Some(_) => DeleteOutcome::Mismatch,
        };
        if outcome == DeleteOutcome::Deleted {
            state.records.remove(key);
        }
        Ok(outcome)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        self.simulate_latency().await;
        {
            let mut state = self.lock_state();
            state.check(StoreOp::Publish)?;
            state.calls.push(StoreCall::Publish {
                channel: channel.to_string(),
                message: message.to_string(),
            });
        }
        // No subscribers is not an error
        let _ = self.bus.send((channel.to_string(), message.to_string()));
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<ReleaseStream, StoreError> {
        self.simulate_latency().await;
        {
            let mut state = self.lock_state();
            state.check(StoreOp::Subscribe)?;
            state.calls.push(StoreCall::Subscribe {
                channel: channel.to_string(),
            });
        }

        let rx = self.bus.subscribe();
        let disconnect = self
            .disconnect
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let channel = channel.to_string();

        let stream = futures::stream::unfold(
            (rx, channel, disconnect),
            |(mut rx, channel, disconnect)| async move {
                loop {
                    let received = tokio::select! {
                        _ = disconnect.cancelled() => return None,
                        received = rx.recv() => received,
                    };
                    match received {
                        Ok((ch, message)) if ch == channel => {
                            return Some((Ok(message), (rx, channel, disconnect)));
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            let err = StoreError::Command(format!(
                                "subscriber lagged by {} messages",
                                n
                            ));
                            return Some((Err(err), (rx, channel, disconnect)));
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        );
        Ok(stream.boxed())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
