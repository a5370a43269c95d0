// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use oq_core::{Operation, OperationStatus};

use crate::queue::QueueStatus;

fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Format a single operation line for list output.
///
/// Failed operations show their reason; pending ones show the error of the
/// last attempt, if any.
pub fn format_operation_line(op: &Operation) -> String {
    let state = if op.attempts == 0 {
        op.status.label().to_string()
    } else {
        format!(
            "{}, {} attempt{}",
            op.status.label(),
            op.attempts,
            plural(op.attempts)
        )
    };
    let line = format!("- [{}] ({}) {}", op.kind, state, op.id);
    match (&op.status, op.last_error.as_deref()) {
        (OperationStatus::Failed { reason }, _) => format!("{}: {}", line, reason),
        (_, Some(error)) => format!("{}: last error: {}", line, error),
        _ => line,
    }
}

/// Format queue counts for status output.
pub fn format_status(status: &QueueStatus) -> Vec<String> {
    let mut lines = vec![
        format!("Pending: {}", status.pending_count),
        format!("Failed: {}", status.failed_count),
    ];
    if let Some(op) = &status.in_flight {
        lines.push(format!("In flight: {} ({})", op.id, op.kind));
    }
    if let Some(error) = &status.last_error {
        lines.push(format!("Last error: {}", error));
    }
    lines
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
