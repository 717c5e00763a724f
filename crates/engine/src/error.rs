// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lock coordinator

use lk_adapters::StoreError;
use lk_core::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by lock acquisition, release and shutdown
#[derive(Debug, Error)]
pub enum LockError {
    #[error("acquire lock: timeout after {0:?}")]
    Timeout(Duration),
    #[error("acquire lock: cancelled")]
    Cancelled,
    #[error("acquire lock: {key} was taken by another owner after release")]
    Contended { key: String },
    #[error("acquire lock: retry limit reached after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<LockError>,
    },
    #[error("subscribe: {0}")]
    SubscribeFailure(String),
    #[error("release lock: {key} is held by another owner")]
    NotOwner { key: String },
    #[error("lock coordinator is closed")]
    Closed,
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LockError {
    /// Whether another full acquisition attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LockError::Timeout(_) | LockError::Contended { .. } | LockError::Store(_)
        )
    }
}
