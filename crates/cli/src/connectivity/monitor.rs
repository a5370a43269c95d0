// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Debounced connectivity monitor.
//!
//! One background task per started monitor reads the source and reports
//! changes, so listeners see transitions in the order they happened and never
//! see the same state twice in a row.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ConnectivityState, Reachability, Readings};
use crate::error::{Error, Result};

/// Quiet window used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

type Listener = Arc<dyn Fn(ConnectivityState) + Send + Sync>;

/// Handle returned by [`ConnectivityMonitor::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Shared {
    source: Mutex<Box<dyn Reachability>>,
    debounce: Duration,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    current: Mutex<Option<ConnectivityState>>,
    /// Token of the running observation task, if any.
    active: Mutex<Option<CancellationToken>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Observes a [`Reachability`] source and notifies listeners of changes.
///
/// Clones share listeners and state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    shared: Arc<Shared>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the default quiet window.
    pub fn new(source: impl Reachability + 'static) -> Self {
        Self::with_debounce(source, DEFAULT_DEBOUNCE)
    }

    /// Creates a monitor that coalesces readings closer together than
    /// `debounce`. A zero window reports every change immediately.
    pub fn with_debounce(source: impl Reachability + 'static, debounce: Duration) -> Self {
        ConnectivityMonitor {
            shared: Arc::new(Shared {
                source: Mutex::new(Box::new(source)),
                debounce,
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                current: Mutex::new(None),
                active: Mutex::new(None),
            }),
        }
    }

    /// Starts observing the source.
    ///
    /// The source is opened before this returns, so no reading taken after
    /// `start` is lost. Observation stops when the returned guard is stopped
    /// or dropped; the monitor can then be started again.
    pub fn start(&self) -> Result<MonitorGuard> {
        let mut active = lock(&self.shared.active);
        if active.as_ref().is_some_and(|token| !token.is_cancelled()) {
            return Err(Error::AlreadyStarted);
        }

        let handle =
            tokio::runtime::Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;
        let token = CancellationToken::new();
        let readings = lock(&self.shared.source).open(token.clone())?;

        let shared = Arc::clone(&self.shared);
        let task_token = token.clone();
        handle.spawn(async move {
            observe(shared, readings, task_token).await;
        });

        debug!(debounce_ms = self.shared.debounce.as_millis() as u64, "connectivity monitor started");
        *active = Some(token.clone());
        Ok(MonitorGuard { token })
    }

    /// True while a started guard is alive.
    pub fn is_running(&self) -> bool {
        lock(&self.shared.active)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Registers a listener for state changes.
    pub fn on_change<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(ConnectivityState) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.shared.listeners).push((id, Arc::new(callback)));
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.shared.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Returns the last reported state, if any has been reported.
    pub fn current(&self) -> Option<ConnectivityState> {
        *lock(&self.shared.current)
    }
}

impl Shared {
    fn report(&self, state: ConnectivityState) {
        {
            let mut current = lock(&self.current);
            if *current == Some(state) {
                return;
            }
            *current = Some(state);
        }

        info!(%state, "connectivity changed");
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(state);
        }
    }
}

/// Reads the source until cancelled, coalescing bursts within the window.
///
/// A reading equal to the settling state keeps its deadline, so a source that
/// repeats itself faster than the window still settles.
async fn observe(shared: Arc<Shared>, mut readings: Readings, cancel: CancellationToken) {
    let window = shared.debounce;
    let mut settling: Option<(ConnectivityState, Instant)> = None;

    loop {
        let reading = match settling {
            Some((state, deadline)) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    reading = readings.recv() => reading,
                    _ = tokio::time::sleep_until(deadline) => {
                        settling = None;
                        shared.report(state);
                        continue;
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    reading = readings.recv() => reading,
                }
            }
        };

        match reading {
            Some(state) if window.is_zero() => shared.report(state),
            Some(state) => match settling {
                Some((settling_state, _)) if settling_state == state => {}
                _ => settling = Some((state, Instant::now() + window)),
            },
            None => {
                // Source closed; flush what was settling.
                if let Some((state, _)) = settling.take() {
                    if !cancel.is_cancelled() {
                        shared.report(state);
                    }
                }
                debug!("reachability source closed");
                return;
            }
        }
    }
}

/// Keeps a monitor running; stops it when stopped or dropped.
#[derive(Debug)]
pub struct MonitorGuard {
    token: CancellationToken,
}

impl MonitorGuard {
    /// Stops observation. Equivalent to dropping the guard.
    pub fn stop(self) {}
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            debug!("connectivity monitor stopped");
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
