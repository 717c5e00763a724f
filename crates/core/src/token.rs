// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner-token generation
//!
//! Each acquisition stores an owner token as the lock record's value. With
//! owner-checked release the same token must be presented to unlock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates owner tokens for lock records
pub trait TokenGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-based token generator for production use
#[derive(Clone, Default)]
pub struct UuidTokenGen;

impl TokenGen for UuidTokenGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential token generator for tests and readable CLI output
#[derive(Clone)]
pub struct SequentialTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokenGen {
    fn default() -> Self {
        Self::new("owner")
    }
}

impl TokenGen for SequentialTokenGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
