// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All errors surfaced by the outq library and CLI.
///
/// Storage-level failures come from the core crate and keep their messages.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] oq_core::Error),

    #[error("connectivity monitor already started\n  hint: stop the running monitor before starting it again")]
    AlreadyStarted,

    #[error("no handler registered for kind '{0}'")]
    UnknownKind(String),

    #[error("no async runtime available: {0}")]
    NoRuntime(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid payload: {0}\n  hint: the payload must be a JSON document, e.g. '{{\"id\":1}}'")]
    InvalidPayload(String),

    #[error("invalid probe address '{0}'\n  hint: use host:port, e.g. example.com:443")]
    InvalidAddress(String),

    #[error("timed out after {secs}s with {pending} operation(s) still pending")]
    DrainTimeout { secs: u64, pending: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures of the durable log; callers may retry these.
    pub fn is_storage(&self) -> bool {
        match self {
            Error::Core(e) => e.is_storage(),
            Error::Io(_) => true,
            _ => false,
        }
    }
}

/// A specialized Result type for outq operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
