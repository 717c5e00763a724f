// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lk-core: shared types for the latchkey distributed lock
//!
//! This crate provides:
//! - Coordinator configuration, loadable from TOML
//! - Lock and waiter-churn counters
//! - Owner-token generation

pub mod config;
pub mod metrics;
pub mod token;

pub use config::{ConfigError, CoordinatorConfig, ReleaseMode};
pub use metrics::{LockMetrics, MetricsSnapshot};
pub use token::{SequentialTokenGen, TokenGen, UuidTokenGen};
