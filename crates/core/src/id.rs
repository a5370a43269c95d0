// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operation identifiers and the clocks that produce them.
//!
//! An [`OperationId`] pairs a wall clock reading with a logical counter, in
//! the manner of a hybrid logical clock restricted to one node:
//!
//! Format: `{wall_ms}-{counter}`
//!
//! Ordering rules:
//! 1. Higher wall_ms wins
//! 2. If wall_ms equal, higher counter wins
//!
//! [`IdClock`] hands out strictly increasing ids even when the wall clock
//! stalls or steps backwards, and can be seeded with previously persisted ids
//! so a restarted process keeps sorting after what it wrote before.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unique, totally ordered identifier of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct OperationId {
    /// Wall clock time in milliseconds since Unix epoch.
    pub wall_ms: u64,
    /// Logical counter for ids minted within the same millisecond.
    pub counter: u32,
}

impl OperationId {
    /// Creates an id from its components.
    pub fn new(wall_ms: u64, counter: u32) -> Self {
        OperationId { wall_ms, counter }
    }

    /// Parses an id from its string representation.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wall_ms, self.counter)
    }
}

impl FromStr for OperationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (wall, counter) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidId(format!("expected 'wall_ms-counter', got '{s}'")))?;

        let wall_ms = wall
            .parse::<u64>()
            .map_err(|_| Error::InvalidId(format!("invalid wall_ms '{wall}' in '{s}'")))?;
        let counter = counter
            .parse::<u32>()
            .map_err(|_| Error::InvalidId(format!("invalid counter '{counter}' in '{s}'")))?;

        Ok(OperationId::new(wall_ms, counter))
    }
}

impl From<OperationId> for String {
    fn from(id: OperationId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for OperationId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Trait for getting the current wall clock time.
///
/// This allows injecting a controllable clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;

    /// Returns the current time as a UTC timestamp.
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_ms() as i64).unwrap_or_default()
    }
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    time_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock reading `initial_ms`.
    pub fn new(initial_ms: u64) -> Self {
        ManualClock {
            time_ms: AtomicU64::new(initial_ms),
        }
    }

    /// Sets the current reading.
    pub fn set(&self, ms: u64) {
        self.time_ms.store(ms, AtomicOrdering::SeqCst);
    }

    /// Moves the reading forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, AtomicOrdering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(AtomicOrdering::SeqCst)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

impl<C: ClockSource> ClockSource for &C {
    fn now_ms(&self) -> u64 {
        (*self).now_ms()
    }
}

/// Generator of strictly increasing [`OperationId`]s.
pub struct IdClock<C: ClockSource = SystemClock> {
    clock: C,
    last: Mutex<OperationId>,
}

impl IdClock<SystemClock> {
    /// Creates an id clock backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for IdClock<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ClockSource> IdClock<C> {
    /// Creates an id clock with a custom clock source.
    pub fn with_clock(clock: C) -> Self {
        IdClock {
            clock,
            last: Mutex::new(OperationId::new(0, 0)),
        }
    }

    /// Returns the underlying clock source.
    pub fn source(&self) -> &C {
        &self.clock
    }

    /// Mints the next id.
    ///
    /// Guarantees a strictly greater id than any previously minted or
    /// observed one, even if the wall clock goes backwards.
    pub fn next(&self) -> OperationId {
        let physical = self.clock.now_ms();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        let next = if physical > last.wall_ms {
            OperationId::new(physical, 0)
        } else {
            // Clock went backwards or stayed the same: bump the counter
            OperationId::new(last.wall_ms, last.counter.saturating_add(1))
        };

        *last = next;
        next
    }

    /// Records an id minted elsewhere (for example by a previous process),
    /// so that every later [`next`](Self::next) sorts after it.
    pub fn observe(&self, seen: &OperationId) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if *seen > *last {
            *last = *seen;
        }
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
