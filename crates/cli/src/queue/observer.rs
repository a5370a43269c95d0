// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only queue status for presentation.
//!
//! The queue publishes a fresh [`QueueStatus`] on every state transition.
//! Readers hold a [`QueueObserver`] and never touch operations directly.

use oq_core::{Operation, OperationStatus, OperationSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Snapshot of queue state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Operations still to be delivered (pending or in flight).
    pub pending_count: usize,
    /// The operation whose handler is running, if any.
    pub in_flight: Option<OperationSummary>,
    /// Most recent terminal failure.
    pub last_error: Option<String>,
    /// Operations that failed terminally and await retry or purge.
    pub failed_count: usize,
    pub online: bool,
}

impl QueueStatus {
    /// Builds a snapshot from operations in enqueue order.
    pub fn from_operations(operations: &[Operation], online: bool, last_error: Option<String>) -> Self {
        let mut status = QueueStatus {
            online,
            last_error,
            ..QueueStatus::default()
        };
        for op in operations {
            match op.status {
                OperationStatus::Pending => status.pending_count += 1,
                OperationStatus::InFlight => {
                    status.pending_count += 1;
                    status.in_flight = Some(op.summary());
                }
                OperationStatus::Failed { .. } => status.failed_count += 1,
                OperationStatus::Completed => {}
            }
        }
        status
    }

    /// Builds a snapshot for a reader that only has the stored operations.
    ///
    /// The last error is taken from the newest terminal failure.
    pub fn summarize(operations: &[Operation]) -> Self {
        let last_error = operations.iter().rev().find_map(describe_failure);
        Self::from_operations(operations, false, last_error)
    }

    /// True when nothing remains to be delivered.
    pub fn is_idle(&self) -> bool {
        self.pending_count == 0
    }
}

/// Describes a terminal failure as `"<id> (<kind>): <reason>"`.
pub fn describe_failure(operation: &Operation) -> Option<String> {
    match &operation.status {
        OperationStatus::Failed { reason } => {
            Some(format!("{} ({}): {}", operation.id, operation.kind, reason))
        }
        _ => None,
    }
}

/// Subscription to a queue's status.
#[derive(Debug, Clone)]
pub struct QueueObserver {
    rx: watch::Receiver<QueueStatus>,
}

impl QueueObserver {
    pub(crate) fn new(rx: watch::Receiver<QueueStatus>) -> Self {
        QueueObserver { rx }
    }

    /// Returns the latest published status.
    pub fn current(&self) -> QueueStatus {
        self.rx.borrow().clone()
    }

    /// Waits for the next published status. Returns `None` once the queue
    /// is gone.
    pub async fn changed(&mut self) -> Option<QueueStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until a published status satisfies `predicate`, checking the
    /// current one first.
    pub async fn wait_until<F>(&mut self, mut predicate: F) -> Option<QueueStatus>
    where
        F: FnMut(&QueueStatus) -> bool,
    {
        let status = self.rx.wait_for(|status| predicate(status)).await.ok()?;
        Some(status.clone())
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
