// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock coordinator configuration
//!
//! Loaded from TOML or built in code. Durations use humantime notation
//! (`"15s"`, `"3m"`, `"250ms"`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How `unlock` treats the stored owner token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseMode {
    /// Delete only when the stored value equals the caller's token
    #[default]
    OwnerChecked,
    /// Delete regardless of who holds the record
    Unconditional,
}

/// Construction parameters for a lock coordinator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Prefix applied to every remote lock key
    pub key_prefix: String,
    /// Shared channel carrying release notifications
    pub channel: String,
    /// How long a blocked caller waits for a release before giving up
    #[serde(with = "humantime_serde")]
    pub wait_timeout: Duration,
    /// Record expiry used by `lock`
    #[serde(with = "humantime_serde")]
    pub default_expiry: Duration,
    /// Number of full acquisition attempts; 0 means a single attempt
    pub retry: u32,
    pub release_mode: ReleaseMode,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            key_prefix: "lock:".to_string(),
            channel: "lock:release".to_string(),
            wait_timeout: Duration::from_secs(15),
            default_expiry: Duration::from_secs(180),
            retry: 0,
            release_mode: ReleaseMode::OwnerChecked,
        }
    }
}

impl CoordinatorConfig {
    pub fn new(key_prefix: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            channel: channel.into(),
            ..Self::default()
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.default_expiry = expiry;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_release_mode(mut self, mode: ReleaseMode) -> Self {
        self.release_mode = mode;
        self
    }

    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.is_empty() {
            return Err(ConfigError::Invalid(
                "release channel must not be empty".to_string(),
            ));
        }
        if self.wait_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "wait_timeout must be greater than zero".to_string(),
            ));
        }
        if self.default_expiry < Duration::from_millis(1) {
            return Err(ConfigError::Invalid(
                "default_expiry must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Fully-qualified remote key for a caller-supplied lock name
    pub fn qualify(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
