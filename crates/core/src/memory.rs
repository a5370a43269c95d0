// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-process operation log.
//!
//! Nothing survives the process, but clones share state, so a test can keep a
//! handle to inspect what the queue stored, reopen a queue over the same
//! contents to simulate a restart, or inject storage failures.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::id::OperationId;
use crate::oplog::OperationLog;
use crate::operation::{Operation, OperationStatus};

#[derive(Debug, Default)]
struct MemoryState {
    operations: Vec<Operation>,
    fail_writes: usize,
    writes: usize,
}

/// Operation log held in memory; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log that already holds `operations`.
    pub fn with_operations(operations: Vec<Operation>) -> Self {
        let log = Self::new();
        log.lock().operations = operations;
        log
    }

    /// Makes the next `count` write calls fail with a storage error.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().fail_writes = count;
    }

    /// Returns a copy of the stored operations.
    pub fn snapshot(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Returns the number of successful write calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_write(state: &mut MemoryState) -> Result<()> {
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(Error::Storage("injected write failure".to_string()));
        }
        state.writes += 1;
        Ok(())
    }
}

impl OperationLog for MemoryLog {
    fn append(&mut self, operation: &Operation) -> Result<()> {
        let mut state = self.lock();
        Self::begin_write(&mut state)?;
        if !state.operations.iter().any(|op| op.id == operation.id) {
            state.operations.push(operation.clone());
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Operation>> {
        Ok(self.snapshot())
    }

    fn update(
        &mut self,
        id: OperationId,
        status: &OperationStatus,
        attempts: u32,
        last_error: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock();
        Self::begin_write(&mut state)?;
        let op = state
            .operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or(Error::OperationNotFound(id))?;
        op.status = status.clone();
        op.attempts = attempts;
        op.last_error = last_error.map(str::to_string);
        Ok(())
    }

    fn remove(&mut self, id: OperationId) -> Result<()> {
        let mut state = self.lock();
        Self::begin_write(&mut state)?;
        state.operations.retain(|op| op.id != id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
