// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key rendezvous for local callers waiting on a remote lock
//!
//! Every local caller blocked on the same key shares one entry. An entry
//! holds a single payload slot: a release hands the slot to one registered
//! waiter, and a release that finds nobody registered tears the entry down.
//! The entry is also removed when its last [`Waiter`] handle is dropped, so
//! timed-out and cancelled callers never leave idle entries behind.

use lk_core::LockMetrics;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// How a blocked waiter was released
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    /// A release notification was handed to this waiter
    Released,
    /// The entry was torn down while this handle was still alive
    Closed,
}

/// What `signal` did with a release notification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalOutcome {
    /// No local waiters for the key; dropped
    NoWaiters,
    /// Payload placed in the slot for one registered waiter
    Delivered,
    /// Slot still holds an undrained payload; entry left alone
    SlotOccupied,
    /// Entry had no registered waiters and was removed
    Closed,
}

#[derive(Default)]
struct SlotState {
    payload: Option<String>,
    closed: bool,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }
}

struct Entry {
    slot: Arc<Slot>,
    waiters: usize,
}

struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    metrics: Arc<LockMetrics>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Registry of waiter entries keyed by fully-qualified lock key
#[derive(Clone)]
pub struct WaiterRegistry {
    inner: Arc<Inner>,
}

impl WaiterRegistry {
    pub fn new(metrics: Arc<LockMetrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                metrics,
            }),
        }
    }

    /// Register as a waiter on `key`, creating the entry if needed
    pub fn acquire(&self, key: &str) -> Waiter {
        let mut entries = self.inner.entries();
        let entry = entries.entry(key.to_string()).or_insert_with(|| {
            self.inner.metrics.incr_waiters_created();
            Entry {
                slot: Arc::new(Slot::default()),
                waiters: 0,
            }
        });
        entry.waiters += 1;

        Waiter {
            key: key.to_string(),
            slot: Arc::clone(&entry.slot),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Deliver a release notification for `key`; never blocks
    pub fn signal(&self, key: &str) -> SignalOutcome {
        let mut entries = self.inner.entries();
        let Some(entry) = entries.get(key) else {
            tracing::trace!(key, "release for key with no local waiters");
            return SignalOutcome::NoWaiters;
        };
        let slot = Arc::clone(&entry.slot);
        let waiters = entry.waiters;

        {
            let mut state = slot.lock();
            if state.payload.is_some() {
                tracing::warn!(key, "release slot already occupied, leaving entry in place");
                return SignalOutcome::SlotOccupied;
            }
            if waiters > 0 {
                state.payload = Some(key.to_string());
            }
        }

        if waiters > 0 {
            slot.notify.notify_waiters();
            tracing::debug!(key, waiters, "release handed to waiter");
            return SignalOutcome::Delivered;
        }

        slot.close();
        entries.remove(key);
        self.inner.metrics.incr_waiters_destroyed();
        tracing::debug!(key, "idle waiter entry closed");
        SignalOutcome::Closed
    }

    /// Number of keys with a live entry
    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries().contains_key(key)
    }

    /// Registered waiters on `key`
    pub fn waiter_count(&self, key: &str) -> usize {
        self.inner.entries().get(key).map_or(0, |e| e.waiters)
    }

    /// Keys that currently have local waiters
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.entries().keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// A registered waiter on one key; deregisters on drop
pub struct Waiter {
    key: String,
    slot: Arc<Slot>,
    registry: Arc<Inner>,
}

impl Waiter {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait until a release is handed to this waiter or the entry closes
    ///
    /// Unbounded; callers race it against a timeout and cancellation.
    pub async fn wait(&self) -> Wake {
        loop {
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking state so a concurrent
            // notify_waiters cannot slip between the check and the await
            notified.as_mut().enable();

            {
                let mut state = self.slot.lock();
                if state.payload.take().is_some() {
                    return Wake::Released;
                }
                if state.closed {
                    return Wake::Closed;
                }
            }

            notified.await;
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        let mut entries = self.registry.entries();
        let Some(entry) = entries.get_mut(&self.key) else {
            return;
        };
        // Entry may have been replaced after this handle's entry closed
        if !Arc::ptr_eq(&entry.slot, &self.slot) {
            return;
        }

        entry.waiters = entry.waiters.saturating_sub(1);
        if entry.waiters == 0 {
            self.slot.close();
            entries.remove(&self.key);
            self.registry.metrics.incr_waiters_destroyed();
            tracing::trace!(key = %self.key, "last waiter left, entry removed");
        }
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter").field("key", &self.key).finish()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
