// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for oq-core operations.

use thiserror::Error;

use crate::id::OperationId;

/// All possible errors that can occur in oq-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted log at line {line}: {reason}")]
    Corrupted { line: usize, reason: String },

    #[error("operation log is locked by another process: {0}\n  hint: only one queue may own a log at a time")]
    Locked(String),

    #[error("operation not found: {0}")]
    OperationNotFound(OperationId),

    #[error("operation {id} is not terminally failed (status: {status})")]
    NotFailed { id: OperationId, status: String },

    #[error("invalid operation id: {0}")]
    InvalidId(String),

    #[error("invalid operation kind: '{0}'\n  hint: kinds are non-empty and contain no whitespace")]
    InvalidKind(String),
}

impl Error {
    /// Returns true for failures of the durable store.
    ///
    /// These are retryable and never fatal to the operation being stored.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Io(_) | Error::Json(_) | Error::Locked(_)
        )
    }
}

/// A specialized Result type for oq-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
