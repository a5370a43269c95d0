// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use oq_core::OperationId;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::queue::OperationQueue;

use super::{open_queue, Settings};

pub async fn run(settings: &Settings, kind: &str, payload: Option<&str>) -> Result<()> {
    let queue = open_queue(settings)?;
    let id = run_impl(&queue, kind, payload).await?;
    println!("{}", id);
    Ok(())
}

/// Internal implementation that accepts the queue for testing.
pub(crate) async fn run_impl(
    queue: &OperationQueue,
    kind: &str,
    payload: Option<&str>,
) -> Result<OperationId> {
    let payload = parse_payload(payload)?;
    queue.enqueue(kind, payload).await
}

/// Parses a JSON payload argument; no argument means `null`.
pub(crate) fn parse_payload(raw: Option<&str>) -> Result<Value> {
    match raw {
        None => Ok(Value::Null),
        Some(raw) => serde_json::from_str(raw).map_err(|e| Error::InvalidPayload(e.to_string())),
    }
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
