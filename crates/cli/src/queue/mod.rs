// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline operation queue.
//!
//! [`OperationQueue`] owns the operations, mediates every access to the
//! durable log, dispatches through the [`HandlerRegistry`] and publishes
//! [`QueueStatus`] snapshots for presentation.

mod engine;
mod observer;
mod registry;
mod retry;
mod timer;

pub use engine::{DrainOutcome, OperationQueue, QueueBuilder, DEFAULT_STORAGE_RETRIES};
pub use observer::{describe_failure, QueueObserver, QueueStatus};
pub use registry::{Handler, HandlerError, HandlerFuture, HandlerRegistry};
pub use retry::RetryPolicy;
pub use timer::{Timer, TokioTimer};
