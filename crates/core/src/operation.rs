// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred operations captured while offline.
//!
//! An [`Operation`] is one unit of application work that must eventually be
//! executed by the handler registered for its [`OperationKind`]. Operations
//! move through a small state machine:
//!
//! ```text
//! Pending ──dispatch──► InFlight ──success──► Completed (removed)
//!    ▲                     │
//!    └──failure, retry─────┤
//!                          └──failure, budget spent──► Failed (terminal)
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::OperationId;

/// Tag selecting which handler executes an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationKind(String);

impl OperationKind {
    /// Creates a kind, rejecting empty tags and tags containing whitespace.
    pub fn new(kind: impl Into<String>) -> Result<Self> {
        let kind = kind.into();
        if kind.is_empty() || kind.chars().any(char::is_whitespace) {
            return Err(Error::InvalidKind(kind));
        }
        Ok(OperationKind(kind))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OperationKind::new(s)
    }
}

impl TryFrom<String> for OperationKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        OperationKind::new(s)
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.0
    }
}

/// Lifecycle status of an operation.
///
/// `Failed` is always terminal. A failure that still has retry budget puts
/// the operation straight back into `Pending`, with the error kept in
/// [`Operation::last_error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    InFlight,
    Failed { reason: String },
    Completed,
}

impl OperationStatus {
    /// Is this a terminal state (no further automatic transitions)?
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Failed { .. } | OperationStatus::Completed)
    }

    /// Is this operation eligible for dispatch?
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, OperationStatus::Pending)
    }

    /// Short lowercase label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::InFlight => "in_flight",
            OperationStatus::Failed { .. } => "failed",
            OperationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Failed { reason } => write!(f, "failed ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// One deferred unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    /// Opaque data handed to the handler.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Execution attempts so far.
    pub attempts: u32,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Operation {
    /// Creates a pending operation with no attempts.
    pub fn new(
        id: OperationId,
        kind: OperationKind,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Operation {
            id,
            kind,
            payload,
            created_at,
            attempts: 0,
            status: OperationStatus::Pending,
            last_error: None,
        }
    }

    /// Returns a lightweight view for status reporting.
    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            id: self.id,
            kind: self.kind.clone(),
            attempts: self.attempts,
            created_at: self.created_at,
        }
    }

    /// Returns true if this operation is terminally failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, OperationStatus::Failed { .. })
    }
}

/// Payload-free description of an operation, safe to hand to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub id: OperationId,
    pub kind: OperationKind,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
