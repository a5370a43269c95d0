// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use oq_core::{JsonlLog, OperationSummary};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::display::format_status;
use crate::error::Result;
use crate::queue::QueueStatus;

use super::Settings;

/// Stored status; connectivity is not known to a reader of the file.
#[derive(Serialize)]
struct StatusOutputJson<'a> {
    pending_count: usize,
    failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_flight: Option<&'a OperationSummary>,
    last_error: Option<&'a str>,
}

pub fn run(settings: &Settings, format: OutputFormat) -> Result<()> {
    let operations = JsonlLog::read_snapshot(&settings.log_path)?;
    let status = QueueStatus::summarize(&operations);
    for line in render(&status, format)? {
        println!("{}", line);
    }
    Ok(())
}

/// Internal implementation that renders output lines for testing.
pub(crate) fn render(status: &QueueStatus, format: OutputFormat) -> Result<Vec<String>> {
    match format {
        OutputFormat::Text => Ok(format_status(status)),
        OutputFormat::Json => {
            let output = StatusOutputJson {
                pending_count: status.pending_count,
                failed_count: status.failed_count,
                in_flight: status.in_flight.as_ref(),
                last_error: status.last_error.as_deref(),
            };
            Ok(vec![serde_json::to_string_pretty(&output)?])
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
