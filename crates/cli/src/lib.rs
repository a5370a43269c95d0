// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outq - A durable offline operation queue.
//!
//! Operations are captured in a local log while the network is unreachable
//! and delivered in order, exactly once per successful handler run, when it
//! comes back.
//!
//! # Main Components
//!
//! - [`OperationQueue`] - Ordered dispatch with retry and backoff
//! - [`ConnectivityMonitor`] - Debounced reachability events
//! - [`QueueRuntime`] - Wires a monitor to a queue for the life of a process
//! - [`QueueConfig`] - TOML configuration
//!
//! # Usage
//!
//! ```rust,ignore
//! use outq::{ConnectivityMonitor, OperationQueue, QueueRuntime, TcpProbe};
//! use oq_core::JsonlLog;
//!
//! let queue = OperationQueue::open(JsonlLog::open("operations.jsonl")?)?;
//! queue.register_handler("note.create", |payload| async move {
//!     upload(payload).await.map_err(|e| e.to_string().into())
//! });
//!
//! let probe = TcpProbe::new("example.com:443", interval, timeout)?;
//! let runtime = QueueRuntime::init(queue, ConnectivityMonitor::new(probe))?;
//! runtime.queue().enqueue("note.create", payload).await?;
//! ```

mod cli;
mod commands;
mod display;

pub mod config;
pub mod connectivity;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod runtime;

pub use cli::{Cli, Command, OutputFormat};
pub use config::{ProbeConfig, QueueConfig};
pub use connectivity::{
    ConnectivityMonitor, ConnectivityState, ManualReachability, MonitorGuard, Reachability,
    TcpProbe,
};
pub use error::{Error, Result};
pub use handlers::ShellHandler;
pub use queue::{
    DrainOutcome, Handler, HandlerError, OperationQueue, QueueObserver, QueueStatus, RetryPolicy,
};
pub use runtime::QueueRuntime;

use commands::Settings;

/// Execute a CLI invocation. This is the main entry point for the binary
/// and provides a testable way to run commands without process execution.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref(), cli.log.as_deref())?;
    match cli.command {
        Command::Enqueue { kind, payload } => {
            commands::enqueue::run(&settings, &kind, payload.as_deref()).await
        }
        Command::List { output } => commands::list::run(&settings, output),
        Command::Status { output } => commands::status::run(&settings, output),
        Command::Retry { id } => commands::retry::run(&settings, &id).await,
        Command::Purge { id } => commands::purge::run(&settings, &id).await,
        Command::Compact => commands::compact::run(&settings),
        Command::Drain { probe, timeout } => commands::drain::run(&settings, probe, timeout).await,
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
