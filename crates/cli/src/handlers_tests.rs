// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::Utc;
use oq_core::{MemoryLog, OperationId, OperationKind};
use serde_json::{json, Value};
use tempfile::TempDir;

fn operation(payload: Value) -> Operation {
    Operation::new(
        OperationId::new(1_700_000_000_000, 3),
        OperationKind::new("upload").unwrap(),
        payload,
        Utc::now(),
    )
}

#[tokio::test]
async fn zero_exit_is_success() {
    let handler = ShellHandler::new("true");
    handler.handle(operation(Value::Null)).await.unwrap();
}

#[tokio::test]
async fn payload_and_environment_reach_command() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.txt");
    let command = format!(
        "cat > '{}' && echo \"$OUTQ_OPERATION_ID $OUTQ_OPERATION_KIND\" >> '{}'",
        out.display(),
        out.display()
    );

    ShellHandler::new(command)
        .handle(operation(json!({"photo": "a.jpg"})))
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, "{\"photo\":\"a.jpg\"}1700000000000-3 upload\n");
}

async fn failure_message(command: &str) -> String {
    ShellHandler::new(command)
        .handle(operation(Value::Null))
        .await
        .unwrap_err()
        .message()
        .to_string()
}

#[tokio::test]
async fn failure_carries_exit_code() {
    assert_eq!(failure_message("exit 3").await, "command exited with 3");
}

#[tokio::test]
async fn failure_carries_stderr() {
    assert_eq!(
        failure_message("echo 'server said no' >&2; exit 1").await,
        "command exited with 1: server said no"
    );
}

#[tokio::test]
async fn command_ignoring_stdin_still_succeeds() {
    let big = "x".repeat(1 << 20);
    ShellHandler::new("exit 0")
        .handle(operation(json!({ "blob": big })))
        .await
        .unwrap();
}

#[tokio::test]
async fn registered_commands_handle_their_kinds() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran");
    let mut handlers = BTreeMap::new();
    handlers.insert("touch".to_string(), format!("touch '{}'", marker.display()));
    handlers.insert("fail".to_string(), "exit 1".to_string());

    let queue = OperationQueue::builder(MemoryLog::new())
        .retry_policy(crate::queue::RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        })
        .open()
        .unwrap();
    register_shell_handlers(&queue, &handlers);

    queue.enqueue("touch", Value::Null).await.unwrap();
    queue.enqueue("fail", Value::Null).await.unwrap();
    queue.on_connectivity_change(crate::connectivity::ConnectivityState::Online);
    let mut observer = queue.subscribe();
    let status = observer.wait_until(|s| s.is_idle()).await.unwrap();

    assert!(marker.exists());
    assert_eq!(status.failed_count, 1);
    assert!(status.last_error.unwrap().contains("command exited with 1"));
}
