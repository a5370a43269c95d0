// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network reachability observation.
//!
//! A [`Reachability`] source produces raw readings. The
//! [`ConnectivityMonitor`] turns them into one ordered, debounced stream of
//! state changes delivered to registered listeners:
//!
//! ```text
//! source ──readings──▶ monitor task ──debounce──▶ listeners
//! ```

mod monitor;
mod reachability;

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub use monitor::{ConnectivityMonitor, ListenerId, MonitorGuard, DEFAULT_DEBOUNCE};
pub use reachability::{ManualReachability, TcpProbe};

/// Whether the network is currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Offline,
    Online,
}

impl ConnectivityState {
    pub fn is_online(self) -> bool {
        self == ConnectivityState::Online
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityState::Offline => f.write_str("offline"),
            ConnectivityState::Online => f.write_str("online"),
        }
    }
}

/// Raw readings from a reachability source, in the order they were taken.
pub type Readings = mpsc::UnboundedReceiver<ConnectivityState>;

/// Platform capability that reports reachability.
///
/// `open` is called synchronously when a monitor starts. The source keeps
/// sending readings until `cancel` fires or the receiver is dropped.
pub trait Reachability: Send {
    fn open(&mut self, cancel: CancellationToken) -> Result<Readings>;
}

impl<R: Reachability + ?Sized> Reachability for Box<R> {
    fn open(&mut self, cancel: CancellationToken) -> Result<Readings> {
        (**self).open(cancel)
    }
}
