// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers that deliver operations by running shell commands.

use std::collections::BTreeMap;
use std::process::Stdio;

use oq_core::Operation;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::queue::{Handler, HandlerError, HandlerFuture, OperationQueue};

/// Runs `sh -c <command>` for each operation.
///
/// The payload is written to stdin as JSON and the operation is described in
/// `OUTQ_OPERATION_ID` and `OUTQ_OPERATION_KIND`. Exit status 0 is success.
#[derive(Debug, Clone)]
pub struct ShellHandler {
    command: String,
}

impl ShellHandler {
    pub fn new(command: impl Into<String>) -> Self {
        ShellHandler {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Handler for ShellHandler {
    fn handle(&self, operation: Operation) -> HandlerFuture {
        let command = self.command.clone();
        Box::pin(async move { run_command(&command, &operation).await })
    }
}

async fn run_command(command: &str, operation: &Operation) -> Result<(), HandlerError> {
    let payload = serde_json::to_vec(&operation.payload)
        .map_err(|e| HandlerError::new(format!("failed to serialize payload: {}", e)))?;

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .env("OUTQ_OPERATION_ID", operation.id.to_string())
        .env("OUTQ_OPERATION_KIND", operation.kind.as_str())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| HandlerError::new(format!("failed to spawn '{}': {}", command, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        // Commands may exit without reading their input
        let _ = stdin.write_all(&payload).await;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| HandlerError::new(format!("failed to wait for '{}': {}", command, e)))?;
    debug!(id = %operation.id, status = %output.status, "handler command exited");

    if output.status.success() {
        return Ok(());
    }
    let code = output
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |code| code.to_string());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Err(HandlerError::new(format!("command exited with {}", code)))
    } else {
        Err(HandlerError::new(format!(
            "command exited with {}: {}",
            code, stderr
        )))
    }
}

/// Registers a [`ShellHandler`] for every `kind = command` entry.
pub fn register_shell_handlers(queue: &OperationQueue, handlers: &BTreeMap<String, String>) {
    for (kind, command) in handlers {
        debug!(%kind, %command, "registering shell handler");
        queue.register_handler(kind.clone(), ShellHandler::new(command.clone()));
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
