// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, ordered log of pending operations.
//!
//! [`OperationLog`] is the storage seam of the queue. [`JsonlLog`] implements
//! it as a journal of JSONL records:
//!
//! ```text
//! {"op":"append","operation":{"id":"1700000000000-0","kind":"note.create",...}}
//! {"op":"update","id":"1700000000000-0","status":{"state":"in_flight"},"attempts":0}
//! {"op":"remove","id":"1700000000000-0"}
//! ```
//!
//! Each record is fsynced before the call returns, so an appended operation
//! survives a crash immediately afterwards. Replaying the journal in file order
//! rebuilds the live operations in their original enqueue order. Records that
//! no longer describe live state accumulate until the journal is compacted.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::OperationId;
use crate::jsonl;
use crate::operation::{Operation, OperationStatus};

/// Dead records tolerated before a journal compacts itself.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 256;

/// Storage for operations that have not yet been removed.
///
/// Implementations must make `append` durable before returning, keep
/// `load_all` in insertion order across restarts, and apply `update` and
/// `remove` atomically with respect to `load_all`.
pub trait OperationLog: Send {
    /// Durably stores a new operation at the tail of the log.
    fn append(&mut self, operation: &Operation) -> Result<()>;

    /// Returns every stored operation in original enqueue order.
    ///
    /// Terminally failed operations are included until they are removed, so
    /// they can still be retried or purged.
    fn load_all(&self) -> Result<Vec<Operation>>;

    /// Records a new status and attempt count for a stored operation.
    fn update(
        &mut self,
        id: OperationId,
        status: &OperationStatus,
        attempts: u32,
        last_error: Option<&str>,
    ) -> Result<()>;

    /// Removes an operation from the log.
    fn remove(&mut self, id: OperationId) -> Result<()>;

    /// Reclaims space held by records that no longer describe live state.
    fn compact(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<L: OperationLog + ?Sized> OperationLog for Box<L> {
    fn append(&mut self, operation: &Operation) -> Result<()> {
        (**self).append(operation)
    }

    fn load_all(&self) -> Result<Vec<Operation>> {
        (**self).load_all()
    }

    fn update(
        &mut self,
        id: OperationId,
        status: &OperationStatus,
        attempts: u32,
        last_error: Option<&str>,
    ) -> Result<()> {
        (**self).update(id, status, attempts, last_error)
    }

    fn remove(&mut self, id: OperationId) -> Result<()> {
        (**self).remove(id)
    }

    fn compact(&mut self) -> Result<()> {
        (**self).compact()
    }
}

/// One line of the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogRecord {
    Append {
        operation: Operation,
    },
    Update {
        id: OperationId,
        status: OperationStatus,
        attempts: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_error: Option<String>,
    },
    Remove {
        id: OperationId,
    },
}

/// Rebuilds live operations from journal records.
///
/// Duplicate appends keep the first copy; updates and removals of unknown ids
/// are ignored so replay is idempotent after compaction.
pub fn replay(records: impl IntoIterator<Item = LogRecord>) -> Vec<Operation> {
    let mut order: Vec<OperationId> = Vec::new();
    let mut live: HashMap<OperationId, Operation> = HashMap::new();

    for record in records {
        match record {
            LogRecord::Append { operation } => {
                if !live.contains_key(&operation.id) {
                    order.push(operation.id);
                    live.insert(operation.id, operation);
                }
            }
            LogRecord::Update {
                id,
                status,
                attempts,
                last_error,
            } => {
                if let Some(op) = live.get_mut(&id) {
                    op.status = status;
                    op.attempts = attempts;
                    op.last_error = last_error;
                }
            }
            LogRecord::Remove { id } => {
                live.remove(&id);
            }
        }
    }

    order.into_iter().filter_map(|id| live.remove(&id)).collect()
}

/// File-backed journal of operations.
///
/// Holds an exclusive advisory lock on `<path>.lock` for its lifetime, so at
/// most one process mutates a given log.
pub struct JsonlLog {
    path: PathBuf,
    /// Ids currently live in the journal.
    live: HashSet<OperationId>,
    /// Records that no longer describe live state.
    dead_records: usize,
    compact_threshold: usize,
    _lock: File,
}

impl JsonlLog {
    /// Opens or creates a journal at the given path.
    ///
    /// Fails with [`Error::Locked`] if another process owns the journal.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let lock_path = jsonl::sibling(&path, ".lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| Error::Locked(lock_path.display().to_string()))?;

        jsonl::repair_tail::<LogRecord>(&path)?;
        let records: Vec<LogRecord> = jsonl::read_all(&path)?;
        let total = records.len();
        let live: HashSet<OperationId> = replay(records).iter().map(|op| op.id).collect();

        Ok(JsonlLog {
            path,
            dead_records: total - live.len(),
            live,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            _lock: lock,
        })
    }

    /// Sets how many dead records trigger automatic compaction (0 disables).
    pub fn with_compact_threshold(mut self, threshold: usize) -> Self {
        self.compact_threshold = threshold;
        self
    }

    /// Reads the operations stored at `path` without taking the writer lock.
    ///
    /// Used by read-only observers of a log owned by another process.
    pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Vec<Operation>> {
        let records: Vec<LogRecord> = jsonl::read_all(path.as_ref())?;
        Ok(replay(records))
    }

    /// Returns the path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of live operations.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if no operations are live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns the number of records compaction would reclaim.
    pub fn dead_records(&self) -> usize {
        self.dead_records
    }

    fn maybe_compact(&mut self) -> Result<()> {
        if self.compact_threshold > 0
            && self.dead_records >= self.compact_threshold
            && self.dead_records > self.live.len()
        {
            self.compact()?;
        }
        Ok(())
    }
}

impl OperationLog for JsonlLog {
    fn append(&mut self, operation: &Operation) -> Result<()> {
        if self.live.contains(&operation.id) {
            return Ok(());
        }

        jsonl::append(
            &self.path,
            &LogRecord::Append {
                operation: operation.clone(),
            },
        )?;
        self.live.insert(operation.id);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Operation>> {
        Self::read_snapshot(&self.path)
    }

    fn update(
        &mut self,
        id: OperationId,
        status: &OperationStatus,
        attempts: u32,
        last_error: Option<&str>,
    ) -> Result<()> {
        if !self.live.contains(&id) {
            return Err(Error::OperationNotFound(id));
        }

        jsonl::append(
            &self.path,
            &LogRecord::Update {
                id,
                status: status.clone(),
                attempts,
                last_error: last_error.map(str::to_string),
            },
        )?;
        self.dead_records += 1;
        self.maybe_compact()
    }

    fn remove(&mut self, id: OperationId) -> Result<()> {
        if !self.live.contains(&id) {
            return Ok(());
        }

        jsonl::append(&self.path, &LogRecord::Remove { id })?;
        self.live.remove(&id);
        // The remove record and the append it cancels
        self.dead_records += 2;
        self.maybe_compact()
    }

    fn compact(&mut self) -> Result<()> {
        let operations = self.load_all()?;
        let records: Vec<LogRecord> = operations
            .into_iter()
            .map(|operation| LogRecord::Append { operation })
            .collect();

        jsonl::write_all(&self.path, &records)?;
        tracing::debug!(
            path = %self.path.display(),
            reclaimed = self.dead_records,
            live = records.len(),
            "compacted operation log"
        );

        self.live = records
            .iter()
            .filter_map(|r| match r {
                LogRecord::Append { operation } => Some(operation.id),
                _ => None,
            })
            .collect();
        self.dead_records = 0;
        Ok(())
    }
}

#[cfg(test)]
#[path = "oplog_tests.rs"]
mod tests;
