// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring between a connectivity monitor and an operation queue.

use tracing::debug;

use crate::connectivity::{ConnectivityMonitor, ListenerId, MonitorGuard};
use crate::error::Result;
use crate::queue::OperationQueue;

/// A queue fed by a running connectivity monitor.
///
/// Dropping the runtime has the same effect as [`teardown`](Self::teardown).
pub struct QueueRuntime {
    queue: OperationQueue,
    monitor: ConnectivityMonitor,
    listener: Option<ListenerId>,
    guard: Option<MonitorGuard>,
}

impl QueueRuntime {
    /// Subscribes `queue` to `monitor`, starts the monitor and resumes any
    /// work left from a previous run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(queue: OperationQueue, monitor: ConnectivityMonitor) -> Result<Self> {
        let subscriber = queue.clone();
        let listener = monitor.on_change(move |state| subscriber.on_connectivity_change(state));

        let guard = match monitor.start() {
            Ok(guard) => guard,
            Err(e) => {
                monitor.remove_listener(listener);
                return Err(e);
            }
        };
        if let Some(state) = monitor.current() {
            queue.on_connectivity_change(state);
        }
        queue.resume();
        debug!("queue runtime started");

        Ok(QueueRuntime {
            queue,
            monitor,
            listener: Some(listener),
            guard: Some(guard),
        })
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Stops the monitor and detaches the queue from it.
    ///
    /// A drain already running finishes the operation in hand; the queue
    /// itself stays usable.
    pub fn teardown(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.stop();
        }
        if let Some(listener) = self.listener.take() {
            self.monitor.remove_listener(listener);
            debug!("queue runtime stopped");
        }
    }
}

impl Drop for QueueRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
