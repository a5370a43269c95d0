// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue configuration.
//!
//! Configuration is read from a TOML file (by default
//! `<config dir>/outq/config.toml`) and includes:
//! - retry budget and backoff bounds for handler failures
//! - storage retry count and connectivity debounce window
//! - an optional reachability probe and the per-kind shell handlers
//!
//! ```toml
//! max_attempts = 3
//! base_delay_ms = 250
//!
//! [probe]
//! address = "example.com:443"
//!
//! [handlers]
//! "note.create" = "curl -sf -X POST --data-binary @- https://example.com/notes"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::queue::RetryPolicy;

const APP_DIR_NAME: &str = "outq";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "operations.jsonl";

/// Settings for the queue, its connectivity monitor and the CLI handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Handler attempts before an operation fails terminally (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff unit in milliseconds (default: 500).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds (default: 60000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Retries of a failed log write before the error is surfaced (default: 3).
    #[serde(default = "default_storage_retries")]
    pub storage_retries: u32,
    /// Connectivity quiet window in milliseconds (default: 500).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Operations older than this fail without being dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_secs: Option<u64>,
    /// Location of the operation log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    /// Reachability probe used by `outq drain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeConfig>,
    /// Shell command per operation kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub handlers: BTreeMap<String, String>,
}

/// TCP reachability probe settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// `host:port` to connect to.
    pub address: String,
    /// Time between probes in milliseconds (default: 2000).
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,
    /// Connect timeout in milliseconds (default: 1000).
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_storage_retries() -> u32 {
    3
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_probe_interval_ms() -> u64 {
    2_000
}

fn default_probe_timeout_ms() -> u64 {
    1_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            storage_retries: default_storage_retries(),
            debounce_ms: default_debounce_ms(),
            max_age_secs: None,
            log_path: None,
            probe: None,
            handlers: BTreeMap::new(),
        }
    }
}

impl ProbeConfig {
    /// Creates probe settings for `address` with default timings.
    pub fn new(address: impl Into<String>) -> Self {
        ProbeConfig {
            address: address.into(),
            interval_ms: default_probe_interval_ms(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl QueueConfig {
    /// Loads configuration from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(QueueConfig::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parses and validates a TOML document.
    pub fn parse(content: &str) -> Result<Self> {
        let config: QueueConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(Error::Config(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        if let Some(kind) = self
            .handlers
            .keys()
            .find(|k| oq_core::OperationKind::new(k.as_str()).is_err())
        {
            return Err(Error::Config(format!("invalid handler kind '{}'", kind)));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }

    /// Picks the log path: explicit override, then config, then the default.
    pub fn resolve_log_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.log_path.clone())
            .unwrap_or_else(default_log_path)
    }
}

/// Default configuration file: `<config dir>/outq/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".outq"))
        .join(CONFIG_FILE_NAME)
}

/// Default operation log: `<state dir>/outq/operations.jsonl`.
///
/// Falls back to the local data directory on platforms without a state dir.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".outq"))
        .join(LOG_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
