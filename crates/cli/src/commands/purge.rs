// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use oq_core::OperationId;

use crate::error::Result;
use crate::queue::OperationQueue;

use super::{open_queue, parse_id, Settings};

pub async fn run(settings: &Settings, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let queue = open_queue(settings)?;
    run_impl(&queue, id).await?;
    println!("Purged {}", id);
    Ok(())
}

/// Internal implementation that accepts the queue for testing.
pub(crate) async fn run_impl(queue: &OperationQueue, id: OperationId) -> Result<()> {
    queue.purge(id).await
}

#[cfg(test)]
#[path = "purge_tests.rs"]
mod tests;
