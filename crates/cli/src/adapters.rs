// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator factory for CLI commands

use anyhow::{Context, Result};
use lk_adapters::{RedisStore, TracedStore};
use lk_core::CoordinatorConfig;
use lk_engine::LockCoordinator;
use std::path::Path;

pub type Coordinator = LockCoordinator<TracedStore<RedisStore>>;

/// Load the coordinator config, falling back to defaults without a file
pub fn load_config(path: Option<&Path>) -> Result<CoordinatorConfig> {
    let Some(path) = path else {
        return Ok(CoordinatorConfig::default());
    };
    Ok(CoordinatorConfig::load(path)?)
}

/// Connect to the store and start a coordinator on it
pub async fn connect(url: &str, config: CoordinatorConfig) -> Result<Coordinator> {
    let store = RedisStore::connect(url)
        .await
        .with_context(|| format!("cannot reach store at {}", url))?;
    Ok(LockCoordinator::start(TracedStore::new(store), config).await?)
}
