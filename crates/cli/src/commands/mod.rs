// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod compact;
pub mod drain;
pub mod enqueue;
pub mod list;
pub mod purge;
pub mod retry;
pub mod status;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::path::{Path, PathBuf};

use oq_core::{JsonlLog, OperationId};

use crate::config::{default_config_path, QueueConfig};
use crate::error::{Error, Result};
use crate::queue::OperationQueue;

/// Configuration and log location for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: QueueConfig,
    pub log_path: PathBuf,
}

impl Settings {
    /// Resolves settings from the global `--config` and `--log` flags.
    ///
    /// An explicit config file must exist; the default one may be absent.
    pub fn load(config_path: Option<&Path>, log_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) if !path.exists() => {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )))
            }
            Some(path) => QueueConfig::load(path)?,
            None => QueueConfig::load(&default_config_path())?,
        };
        let log_path = config.resolve_log_path(log_path);
        Ok(Settings { config, log_path })
    }
}

/// Helper to open the queue over the configured log.
///
/// The queue takes the log's writer lock and starts offline.
pub fn open_queue(settings: &Settings) -> Result<OperationQueue> {
    let log = JsonlLog::open(&settings.log_path)?;
    OperationQueue::builder(log)
        .retry_policy(settings.config.retry_policy())
        .storage_retries(settings.config.storage_retries)
        .max_age(settings.config.max_age())
        .open()
}

/// Parses an operation id given on the command line.
pub fn parse_id(id: &str) -> Result<OperationId> {
    Ok(OperationId::parse(id.trim())?)
}
