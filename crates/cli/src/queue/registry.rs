// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers that carry out operations, keyed by operation kind.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use oq_core::Operation;

/// Failure reported by a handler. Retried until the budget runs out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::new(message)
    }
}

/// Future returned by [`Handler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// Performs operations of one kind.
///
/// Any `Fn(serde_json::Value) -> impl Future<Output = Result<(), HandlerError>>`
/// is a handler that only sees the payload.
pub trait Handler: Send + Sync {
    fn handle(&self, operation: Operation) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(&self, operation: Operation) -> HandlerFuture {
        Box::pin(self(operation.payload))
    }
}

/// Kind-to-handler table shared by a queue and its clones.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Mutex<HashMap<String, Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn register(&self, kind: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind.into(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Handler>> {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(kind)
            .cloned()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
