// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Latchkey lock coordinator
//!
//! Turns a store's set-if-absent primitive into a blocking lock. Waiters
//! park in a per-key registry and are woken by release notifications that
//! arrive over one shared subscription per coordinator.

mod coordinator;
mod error;
mod registry;
mod subscriber;

pub use coordinator::LockCoordinator;
pub use error::LockError;
pub use registry::{SignalOutcome, Wake, Waiter, WaiterRegistry};
pub use subscriber::SubscriberState;
