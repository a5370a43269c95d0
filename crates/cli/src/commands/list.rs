// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use oq_core::{JsonlLog, Operation};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::display::format_operation_line;
use crate::error::Result;

use super::Settings;

#[derive(Serialize)]
struct ListOutputJson<'a> {
    operations: &'a [Operation],
}

/// Lists the stored operations. Reads without taking the writer lock, so it
/// works while another process drains the log.
pub fn run(settings: &Settings, format: OutputFormat) -> Result<()> {
    let operations = JsonlLog::read_snapshot(&settings.log_path)?;
    for line in render(&operations, format)? {
        println!("{}", line);
    }
    Ok(())
}

/// Internal implementation that renders output lines for testing.
pub(crate) fn render(operations: &[Operation], format: OutputFormat) -> Result<Vec<String>> {
    match format {
        OutputFormat::Text => {
            if operations.is_empty() {
                return Ok(vec!["No operations".to_string()]);
            }
            Ok(operations.iter().map(format_operation_line).collect())
        }
        OutputFormat::Json => {
            let output = ListOutputJson { operations };
            Ok(vec![serde_json::to_string_pretty(&output)?])
        }
    }
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
