// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::Result;

use super::{open_queue, Settings};

pub fn run(settings: &Settings) -> Result<()> {
    let queue = open_queue(settings)?;
    queue.compact()?;
    println!("Compacted {}", settings.log_path.display());
    Ok(())
}

#[cfg(test)]
#[path = "compact_tests.rs"]
mod tests;
