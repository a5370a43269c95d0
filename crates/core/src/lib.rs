// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! oq-core: Shared library for the outq offline operation queue
//!
//! This crate provides the operation model, identifiers and the durable
//! operation log used by the queue runtime and the `outq` CLI.

pub mod error;
pub mod id;
pub mod jsonl;
pub mod memory;
pub mod operation;
pub mod oplog;

pub use error::{Error, Result};
pub use id::{ClockSource, IdClock, ManualClock, OperationId, SystemClock};
pub use memory::MemoryLog;
pub use operation::{Operation, OperationKind, OperationStatus, OperationSummary};
pub use oplog::{JsonlLog, LogRecord, OperationLog};
