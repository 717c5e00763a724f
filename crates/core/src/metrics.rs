// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock coordinator counters
//!
//! `waiters_created` and `waiters_destroyed` track registry churn; once every
//! local waiter has left they must be equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters owned by one coordinator
#[derive(Debug, Default)]
pub struct LockMetrics {
    locked: AtomicU64,
    unlocked: AtomicU64,
    waiters_created: AtomicU64,
    waiters_destroyed: AtomicU64,
}

impl LockMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_locked(&self) {
        self.locked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_unlocked(&self) {
        self.unlocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_waiters_created(&self) {
        self.waiters_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_waiters_destroyed(&self) {
        self.waiters_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            locked: self.locked.load(Ordering::Relaxed),
            unlocked: self.unlocked.load(Ordering::Relaxed),
            waiters_created: self.waiters_created.load(Ordering::Relaxed),
            waiters_destroyed: self.waiters_destroyed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LockMetrics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub locked: u64,
    pub unlocked: u64,
    pub waiters_created: u64,
    pub waiters_destroyed: u64,
}

impl MetricsSnapshot {
    /// Registry entries created but not yet torn down
    pub fn live_waiters(&self) -> u64 {
        self.waiters_created.saturating_sub(self.waiters_destroyed)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "locked: {}, unlocked: {}, waiters_created: {}, waiters_destroyed: {}",
            self.locked, self.unlocked, self.waiters_created, self.waiters_destroyed
        )
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
