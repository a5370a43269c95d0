// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The operation queue.
//!
//! Operations are appended to the durable log, then dispatched strictly in
//! enqueue order by a single drain loop whenever the queue is online:
//!
//! ```text
//! enqueue ──▶ log.append ──▶ drain (if online)
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!          handler ok                    handler failed
//!       log.remove (done)        attempts < max: back off, retry same op
//!                                attempts = max: Failed, continue with next
//! ```
//!
//! A drain that loses connectivity stops before the next dispatch or during a
//! backoff wait. A handler already running is never cancelled; its result is
//! applied when it arrives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use oq_core::{
    ClockSource, IdClock, Operation, OperationId, OperationKind, OperationLog, OperationStatus,
    SystemClock,
};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::observer::{describe_failure, QueueObserver, QueueStatus};
use super::registry::{Handler, HandlerRegistry};
use super::retry::RetryPolicy;
use super::timer::{Timer, TokioTimer};
use crate::connectivity::ConnectivityState;
use crate::error::{Error, Result};

/// Log write retries used when none are configured.
pub const DEFAULT_STORAGE_RETRIES: u32 = 3;

/// How a call to [`OperationQueue::drain`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// No dispatchable operations remain.
    Finished,
    /// Connectivity was lost; remaining operations keep their position.
    Interrupted,
    /// The queue is offline; nothing was dispatched.
    Offline,
    /// Another drain is running and will pick up any new work.
    AlreadyDraining,
}

enum Dispatched {
    Completed,
    Failed,
    Retry(Duration),
}

struct LogSlot {
    log: Box<dyn OperationLog>,
    /// Completed operations whose removal has not reached the log yet.
    unsynced_removals: Vec<OperationId>,
}

impl LogSlot {
    fn flush_removals(&mut self) {
        if self.unsynced_removals.is_empty() {
            return;
        }
        let log = &mut self.log;
        self.unsynced_removals.retain(|id| match log.remove(*id) {
            Ok(()) => {
                debug!(%id, "recorded deferred removal");
                false
            }
            Err(_) => true,
        });
    }
}

struct QueueState {
    /// Every operation not yet removed, in enqueue order.
    operations: Vec<Operation>,
    online: bool,
    last_error: Option<String>,
    /// Set while `last_error` describes a log outage.
    stalled: bool,
}

impl QueueState {
    fn find_mut(&mut self, id: OperationId) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| op.id == id)
    }

    fn has_dispatchable(&self) -> bool {
        self.operations.iter().any(|op| op.status.is_dispatchable())
    }

    fn status(&self) -> QueueStatus {
        QueueStatus::from_operations(&self.operations, self.online, self.last_error.clone())
    }

    /// Points `last_error` back at the latest terminal failure, if any.
    fn restore_failure_error(&mut self) {
        self.last_error = self.operations.iter().rev().find_map(describe_failure);
    }

    fn forget_error_if_clear(&mut self) {
        if !self.operations.iter().any(Operation::is_failed) {
            self.last_error = None;
        }
    }
}

struct Inner {
    log: Mutex<LogSlot>,
    state: Mutex<QueueState>,
    handlers: HandlerRegistry,
    policy: RetryPolicy,
    storage_retries: u32,
    max_age: Option<Duration>,
    clock: Arc<dyn ClockSource>,
    ids: IdClock<Arc<dyn ClockSource>>,
    timer: Arc<dyn Timer>,
    status_tx: watch::Sender<QueueStatus>,
    online_tx: watch::Sender<bool>,
    draining: AtomicBool,
}

impl Inner {
    // Lock order: log before state.
    fn lock_log(&self) -> MutexGuard<'_, LogSlot> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Configures and opens an [`OperationQueue`].
pub struct QueueBuilder {
    log: Box<dyn OperationLog>,
    policy: RetryPolicy,
    storage_retries: u32,
    max_age: Option<Duration>,
    clock: Arc<dyn ClockSource>,
    timer: Arc<dyn Timer>,
}

impl QueueBuilder {
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Retries of a failed log write before the error is surfaced.
    pub fn storage_retries(mut self, retries: u32) -> Self {
        self.storage_retries = retries;
        self
    }

    /// Fails operations older than `max_age` instead of dispatching them.
    pub fn max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn clock(mut self, clock: impl ClockSource + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn timer(mut self, timer: impl Timer + 'static) -> Self {
        self.timer = Arc::new(timer);
        self
    }

    /// Loads the log and recovers operations interrupted by a crash.
    ///
    /// Operations stored as in flight go back to pending: their handler may
    /// or may not have finished, so they are delivered again.
    pub fn open(self) -> Result<OperationQueue> {
        let mut log = self.log;
        let ids = IdClock::with_clock(Arc::clone(&self.clock));

        let mut operations = Vec::new();
        for mut op in log.load_all()? {
            ids.observe(&op.id);
            match op.status {
                OperationStatus::Completed => {
                    log.remove(op.id)?;
                    continue;
                }
                OperationStatus::InFlight => {
                    warn!(id = %op.id, kind = %op.kind, "operation was in flight at shutdown, will deliver again");
                    log.update(
                        op.id,
                        &OperationStatus::Pending,
                        op.attempts,
                        op.last_error.as_deref(),
                    )?;
                    op.status = OperationStatus::Pending;
                }
                _ => {}
            }
            operations.push(op);
        }

        let state = QueueState {
            last_error: operations.iter().rev().find_map(describe_failure),
            operations,
            online: false,
            stalled: false,
        };
        debug!(
            operations = state.operations.len(),
            "operation queue opened"
        );
        let (status_tx, _) = watch::channel(state.status());
        let (online_tx, _) = watch::channel(false);

        Ok(OperationQueue {
            inner: Arc::new(Inner {
                log: Mutex::new(LogSlot {
                    log,
                    unsynced_removals: Vec::new(),
                }),
                state: Mutex::new(state),
                handlers: HandlerRegistry::default(),
                policy: self.policy,
                storage_retries: self.storage_retries,
                max_age: self.max_age,
                clock: self.clock,
                ids,
                timer: self.timer,
                status_tx,
                online_tx,
                draining: AtomicBool::new(false),
            }),
        })
    }
}

/// Durable FIFO of deferred operations.
///
/// Clones share the same queue. Start offline; connectivity is fed in through
/// [`on_connectivity_change`](Self::on_connectivity_change).
#[derive(Clone)]
pub struct OperationQueue {
    inner: Arc<Inner>,
}

impl OperationQueue {
    pub fn builder(log: impl OperationLog + 'static) -> QueueBuilder {
        QueueBuilder {
            log: Box::new(log),
            policy: RetryPolicy::default(),
            storage_retries: DEFAULT_STORAGE_RETRIES,
            max_age: None,
            clock: Arc::new(SystemClock),
            timer: Arc::new(TokioTimer),
        }
    }

    /// Opens a queue over `log` with default settings.
    pub fn open(log: impl OperationLog + 'static) -> Result<Self> {
        Self::builder(log).open()
    }

    /// Registers the handler for operations of `kind`.
    pub fn register_handler(&self, kind: impl Into<String>, handler: impl Handler + 'static) {
        self.inner.handlers.register(kind, Arc::new(handler));
    }

    /// Durably records a new operation and returns its id.
    ///
    /// Log failures are retried with backoff; an error means the operation
    /// was not captured. If online, a drain is started in the background.
    pub async fn enqueue(&self, kind: &str, payload: Value) -> Result<OperationId> {
        let kind = OperationKind::new(kind)?;
        let mut failures = 0;

        let id = loop {
            let appended = {
                let mut slot = self.inner.lock_log();
                slot.flush_removals();
                let op = Operation::new(
                    self.inner.ids.next(),
                    kind.clone(),
                    payload.clone(),
                    self.inner.clock.now_utc(),
                );
                slot.log.append(&op).map(|()| {
                    let id = op.id;
                    self.inner.lock_state().operations.push(op);
                    id
                })
            };
            match appended {
                Ok(id) => break id,
                Err(e) => self.back_off("append", &mut failures, e.into()).await?,
            }
        };

        debug!(%id, %kind, "enqueued");
        self.publish();
        self.spawn_drain();
        Ok(id)
    }

    /// Dispatches pending operations in order until none remain or the
    /// queue goes offline.
    ///
    /// Only one drain runs at a time; a concurrent call returns
    /// [`DrainOutcome::AlreadyDraining`] and the running drain picks up
    /// operations enqueued meanwhile.
    pub async fn drain(&self) -> Result<DrainOutcome> {
        if !self.try_begin_drain() {
            return Ok(DrainOutcome::AlreadyDraining);
        }
        loop {
            let outcome = self.drain_pass().await;
            self.inner.draining.store(false, Ordering::SeqCst);
            match outcome {
                // Work may have arrived after the last check but before the
                // flag was cleared.
                Ok(DrainOutcome::Finished) if self.has_work() => {
                    if !self.try_begin_drain() {
                        return Ok(DrainOutcome::Finished);
                    }
                }
                other => return other,
            }
        }
    }

    /// Starts a background drain if online and anything is pending.
    pub fn resume(&self) {
        self.spawn_drain();
    }

    /// Applies a connectivity transition.
    pub fn on_connectivity_change(&self, state: ConnectivityState) {
        let online = state.is_online();
        let changed = {
            let mut queue = self.inner.lock_state();
            let changed = queue.online != online;
            queue.online = online;
            changed
        };
        self.inner.online_tx.send_replace(online);
        if !changed {
            return;
        }
        debug!(%state, "queue connectivity updated");
        self.publish();
        self.spawn_drain();
    }

    /// Puts a terminally failed operation back in line with a fresh budget.
    pub async fn retry_failed(&self, id: OperationId) -> Result<()> {
        let op = self.failed_operation(id)?;
        self.write("retry", |log| {
            log.update(id, &OperationStatus::Pending, 0, None)
        })
        .await?;
        {
            let mut state = self.inner.lock_state();
            if let Some(op) = state.find_mut(id) {
                op.status = OperationStatus::Pending;
                op.attempts = 0;
                op.last_error = None;
            }
            state.forget_error_if_clear();
        }
        info!(%id, kind = %op.kind, "failed operation queued for retry");
        self.publish();
        self.spawn_drain();
        Ok(())
    }

    /// Removes a terminally failed operation from the queue and the log.
    pub async fn purge(&self, id: OperationId) -> Result<()> {
        let op = self.failed_operation(id)?;
        self.write("purge", |log| log.remove(id)).await?;
        {
            let mut state = self.inner.lock_state();
            state.operations.retain(|op| op.id != id);
            state.forget_error_if_clear();
        }
        info!(%id, kind = %op.kind, "failed operation purged");
        self.publish();
        Ok(())
    }

    /// Reclaims log space held by superseded records.
    pub fn compact(&self) -> Result<()> {
        let mut slot = self.inner.lock_log();
        slot.flush_removals();
        slot.log.compact()?;
        Ok(())
    }

    /// Returns every tracked operation in enqueue order.
    pub fn operations(&self) -> Vec<Operation> {
        self.inner.lock_state().operations.clone()
    }

    /// Returns a status snapshot.
    pub fn status(&self) -> QueueStatus {
        self.inner.lock_state().status()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> QueueObserver {
        QueueObserver::new(self.inner.status_tx.subscribe())
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock_state().online
    }

    fn has_work(&self) -> bool {
        let state = self.inner.lock_state();
        state.online && state.has_dispatchable()
    }

    fn try_begin_drain(&self) -> bool {
        self.inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn spawn_drain(&self) {
        // A running drain re-checks for work before it exits.
        if self.inner.draining.load(Ordering::SeqCst) || !self.has_work() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, drain deferred");
            return;
        };
        let queue = self.clone();
        handle.spawn(async move {
            if let Err(e) = queue.drain().await {
                warn!(error = %e, "drain stopped");
            }
        });
    }

    fn publish(&self) {
        let status = self.status();
        self.inner.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    async fn drain_pass(&self) -> Result<DrainOutcome> {
        if !self.is_online() {
            return Ok(DrainOutcome::Offline);
        }
        let backlog = self
            .inner
            .lock_state()
            .operations
            .iter()
            .filter(|op| op.status.is_dispatchable())
            .count();
        if backlog == 0 {
            return Ok(DrainOutcome::Finished);
        }

        info!(backlog, "drain started");
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut stalls = 0u32;
        loop {
            if !self.is_online() {
                info!(completed, failed, "drain interrupted, offline");
                return Ok(DrainOutcome::Interrupted);
            }
            let Some(operation) = self.next_dispatchable() else {
                break;
            };
            let (id, kind) = (operation.id, operation.kind.clone());
            let dispatched = match self.dispatch(operation).await {
                Ok(dispatched) => {
                    stalls = 0;
                    dispatched
                }
                Err(e) if e.is_storage() => {
                    stalls = stalls.saturating_add(1);
                    let delay = self.inner.policy.delay_for(stalls);
                    self.stall(id, &kind, &e, delay);
                    Dispatched::Retry(delay)
                }
                Err(e) => return Err(e),
            };
            match dispatched {
                Dispatched::Completed => completed += 1,
                Dispatched::Failed => failed += 1,
                Dispatched::Retry(delay) => {
                    if !self.wait_online(delay).await {
                        info!(completed, failed, "drain interrupted during backoff, offline");
                        return Ok(DrainOutcome::Interrupted);
                    }
                }
            }
        }
        info!(completed, failed, "drain finished");
        Ok(DrainOutcome::Finished)
    }

    /// Reports a log that could not take the next dispatch. The operation
    /// keeps its place and is tried again after `delay`.
    fn stall(&self, id: OperationId, kind: &OperationKind, err: &Error, delay: Duration) {
        warn!(
            %id,
            %kind,
            retry_in_ms = delay.as_millis() as u64,
            error = %err,
            "log unavailable, dispatch postponed"
        );
        {
            let mut state = self.inner.lock_state();
            state.last_error = Some(format!("{} ({}): {}", id, kind, err));
            state.stalled = true;
        }
        self.publish();
    }

    fn next_dispatchable(&self) -> Option<Operation> {
        self.inner
            .lock_state()
            .operations
            .iter()
            .find(|op| op.status.is_dispatchable())
            .cloned()
    }

    /// Sleeps for `delay`; returns false as soon as the queue goes offline.
    async fn wait_online(&self, delay: Duration) -> bool {
        let mut online = self.inner.online_tx.subscribe();
        if !*online.borrow_and_update() {
            return false;
        }
        let slept = tokio::select! {
            _ = self.inner.timer.sleep(delay) => true,
            _ = online.wait_for(|online| !*online) => false,
        };
        slept && *online.borrow()
    }

    async fn dispatch(&self, operation: Operation) -> Result<Dispatched> {
        let id = operation.id;

        if let Some(max_age) = self.inner.max_age {
            let age = self
                .inner
                .clock
                .now_utc()
                .signed_duration_since(operation.created_at);
            if age.to_std().is_ok_and(|age| age > max_age) {
                let reason = format!("expired after {}s without delivery", age.num_seconds());
                self.fail_terminally(&operation, operation.attempts, reason, None)
                    .await;
                return Ok(Dispatched::Failed);
            }
        }

        let Some(handler) = self.inner.handlers.get(operation.kind.as_str()) else {
            let reason = Error::UnknownKind(operation.kind.to_string()).to_string();
            self.fail_terminally(&operation, operation.attempts, reason.clone(), Some(reason))
                .await;
            return Ok(Dispatched::Failed);
        };

        self.write("mark in flight", |log| {
            log.update(
                id,
                &OperationStatus::InFlight,
                operation.attempts,
                operation.last_error.as_deref(),
            )
        })
        .await?;
        self.set_status(id, OperationStatus::InFlight, operation.attempts, operation.last_error.clone());
        {
            let mut state = self.inner.lock_state();
            if state.stalled {
                state.stalled = false;
                state.restore_failure_error();
            }
        }
        self.publish();
        debug!(%id, kind = %operation.kind, attempt = operation.attempts + 1, "dispatching");

        let kind = operation.kind.clone();
        match handler.handle(operation.clone()).await {
            Ok(()) => {
                self.complete(id).await;
                debug!(%id, %kind, "completed");
                Ok(Dispatched::Completed)
            }
            Err(e) => {
                let attempts = operation.attempts.saturating_add(1);
                let message = e.to_string();
                if self.inner.policy.is_exhausted(attempts) {
                    let reason = format!("gave up after {} attempts: {}", attempts, message);
                    self.fail_terminally(&operation, attempts, reason, Some(message))
                        .await;
                    Ok(Dispatched::Failed)
                } else {
                    let delay = self.inner.policy.delay_for(attempts);
                    warn!(
                        %id,
                        %kind,
                        attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %message,
                        "handler failed, will retry"
                    );
                    self.record(id, OperationStatus::Pending, attempts, Some(message))
                        .await;
                    Ok(Dispatched::Retry(delay))
                }
            }
        }
    }

    async fn fail_terminally(
        &self,
        operation: &Operation,
        attempts: u32,
        reason: String,
        last_error: Option<String>,
    ) {
        error!(id = %operation.id, kind = %operation.kind, %reason, "operation failed");
        let status = OperationStatus::Failed { reason };
        self.record(operation.id, status, attempts, last_error).await;

        let mut state = self.inner.lock_state();
        let description = state
            .find_mut(operation.id)
            .and_then(|op| describe_failure(op));
        if description.is_some() {
            state.last_error = description;
        }
        drop(state);
        self.publish();
    }

    /// Applies a dispatch result. The result stands even if the log cannot
    /// record it; recovery on the next open then redelivers.
    async fn record(
        &self,
        id: OperationId,
        status: OperationStatus,
        attempts: u32,
        last_error: Option<String>,
    ) {
        let written = self
            .write("record result", |log| {
                log.update(id, &status, attempts, last_error.as_deref())
            })
            .await;
        if let Err(e) = written {
            warn!(%id, error = %e, "could not record dispatch result");
        }
        self.set_status(id, status, attempts, last_error);
        self.publish();
    }

    /// Removes a delivered operation. The log is settled before the new
    /// status is published.
    async fn complete(&self, id: OperationId) {
        if let Err(e) = self.write("remove", |log| log.remove(id)).await {
            warn!(%id, error = %e, "could not record completion, will retry before next write");
            self.inner.lock_log().unsynced_removals.push(id);
        }

        self.inner
            .lock_state()
            .operations
            .retain(|op| op.id != id);
        self.publish();
    }

    fn set_status(
        &self,
        id: OperationId,
        status: OperationStatus,
        attempts: u32,
        last_error: Option<String>,
    ) {
        if let Some(op) = self.inner.lock_state().find_mut(id) {
            op.status = status;
            op.attempts = attempts;
            op.last_error = last_error;
        }
    }

    fn failed_operation(&self, id: OperationId) -> Result<Operation> {
        let state = self.inner.lock_state();
        let op = state
            .operations
            .iter()
            .find(|op| op.id == id)
            .ok_or(oq_core::Error::OperationNotFound(id))?;
        if !op.is_failed() {
            return Err(oq_core::Error::NotFailed {
                id,
                status: op.status.to_string(),
            }
            .into());
        }
        Ok(op.clone())
    }

    /// Runs a log write, retrying storage failures with backoff.
    async fn write<F>(&self, what: &'static str, mut write: F) -> Result<()>
    where
        F: FnMut(&mut Box<dyn OperationLog>) -> oq_core::Result<()> + Send,
    {
        let mut failures = 0;
        loop {
            let result = {
                let mut slot = self.inner.lock_log();
                slot.flush_removals();
                write(&mut slot.log)
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) => self.back_off(what, &mut failures, e.into()).await?,
            }
        }
    }

    /// Waits before another attempt at a failed log write, or gives up.
    async fn back_off(&self, what: &'static str, failures: &mut u32, err: Error) -> Result<()> {
        if !err.is_storage() || *failures >= self.inner.storage_retries {
            return Err(err);
        }
        let delay = self.inner.policy.delay_for(*failures);
        *failures += 1;
        warn!(
            what,
            attempt = *failures,
            retry_in_ms = delay.as_millis() as u64,
            error = %err,
            "log write failed, retrying"
        );
        self.inner.timer.sleep(delay).await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
