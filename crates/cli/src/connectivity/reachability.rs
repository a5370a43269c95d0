// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in reachability sources.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{ConnectivityState, Reachability, Readings};
use crate::config::ProbeConfig;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct ManualState {
    latest: Option<ConnectivityState>,
    tx: Option<mpsc::UnboundedSender<ConnectivityState>>,
}

/// Reachability pushed in by the embedding application.
///
/// Models callback-style platform APIs: whatever observes the network calls
/// [`set`](Self::set). Clones share state, so one handle can be given to a
/// monitor while another keeps reporting.
#[derive(Debug, Clone, Default)]
pub struct ManualReachability {
    inner: Arc<Mutex<ManualState>>,
}

impl ManualReachability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source whose first reading is `state`.
    pub fn with_state(state: ConnectivityState) -> Self {
        let source = Self::new();
        source.set(state);
        source
    }

    /// Reports a reading. Delivered to the open monitor, if any, and replayed
    /// as the first reading of the next one otherwise.
    pub fn set(&self, state: ConnectivityState) {
        let mut inner = self.lock();
        inner.latest = Some(state);
        let closed = inner.tx.as_ref().is_some_and(|tx| tx.send(state).is_err());
        if closed {
            inner.tx = None;
        }
    }

    /// Returns the most recent reading.
    pub fn latest(&self) -> Option<ConnectivityState> {
        self.lock().latest
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Reachability for ManualReachability {
    fn open(&mut self, _cancel: CancellationToken) -> Result<Readings> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if let Some(state) = inner.latest {
            let _ = tx.send(state);
        }
        inner.tx = Some(tx);
        Ok(rx)
    }
}

/// Polls reachability by opening a TCP connection to a fixed address.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    interval: Duration,
    timeout: Duration,
}

impl TcpProbe {
    /// Creates a probe for `address` (`host:port`).
    pub fn new(address: impl Into<String>, interval: Duration, timeout: Duration) -> Result<Self> {
        let address = address.into();
        let valid = address
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !valid {
            return Err(Error::InvalidAddress(address));
        }
        Ok(TcpProbe {
            address,
            interval,
            timeout,
        })
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        Self::new(config.address.clone(), config.interval(), config.timeout())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Takes a single reading.
    pub async fn probe_once(&self) -> ConnectivityState {
        probe(&self.address, self.timeout).await
    }
}

async fn probe(address: &str, timeout: Duration) -> ConnectivityState {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_)) => ConnectivityState::Online,
        Ok(Err(e)) => {
            tracing::trace!(address, error = %e, "probe failed");
            ConnectivityState::Offline
        }
        Err(_) => {
            tracing::trace!(address, "probe timed out");
            ConnectivityState::Offline
        }
    }
}

impl Reachability for TcpProbe {
    fn open(&mut self, cancel: CancellationToken) -> Result<Readings> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let address = self.address.clone();
        let interval = self.interval;
        let timeout = self.timeout;

        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let state = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    state = probe(&address, timeout) => state,
                };
                if tx.send(state).is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
#[path = "reachability_tests.rs"]
mod tests;
