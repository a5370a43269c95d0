// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outq status`.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn outq() -> Command {
    cargo_bin_cmd!("outq")
}

fn outq_with_config(temp: &TempDir, config: &str) -> Command {
    let path = temp.path().join("config.toml");
    std::fs::write(&path, config).unwrap();
    let mut cmd = outq();
    cmd.arg("--log")
        .arg(temp.path().join("operations.jsonl"))
        .arg("--config")
        .arg(path);
    cmd
}

fn outq_in(temp: &TempDir) -> Command {
    outq_with_config(temp, "")
}

#[test]
fn empty_queue() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout("Pending: 0\nFailed: 0\n");
}

#[test]
fn counts_pending() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp).args(["enqueue", "a"]).assert().success();
    outq_in(&temp).args(["enqueue", "b"]).assert().success();

    outq_in(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Pending: 2\nFailed: 0\n"));
}

#[test]
fn reports_last_failure() {
    let temp = TempDir::new().unwrap();
    let config = "max_attempts = 1\n\n[handlers]\nbroken = \"echo nope >&2; exit 2\"\n";
    outq_with_config(&temp, config)
        .args(["enqueue", "broken"])
        .assert()
        .success();
    outq_with_config(&temp, config)
        .arg("drain")
        .assert()
        .success();

    let output = outq_with_config(&temp, config)
        .args(["status", "-o", "json"])
        .output()
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["pending_count"], 0);
    assert_eq!(status["failed_count"], 1);
    let last_error = status["last_error"].as_str().unwrap();
    assert!(last_error.contains("(broken)"), "{}", last_error);
    assert!(last_error.contains("command exited with 2: nope"), "{}", last_error);
}

#[test]
fn bad_config_fails() {
    let temp = TempDir::new().unwrap();
    outq_with_config(&temp, "max_attempts = \"many\"\n")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: config error: failed to parse config"));
}
