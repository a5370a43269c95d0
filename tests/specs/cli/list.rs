// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outq list`.

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

fn outq_in(temp: &TempDir) -> Command {
    let config = temp.path().join("config.toml");
    if !config.exists() {
        std::fs::write(&config, "").unwrap();
    }
    let mut cmd = outq();
    cmd.arg("--log")
        .arg(temp.path().join("operations.jsonl"))
        .arg("--config")
        .arg(config);
    cmd
}

fn enqueue(temp: &TempDir, kind: &str) -> String {
    let output = outq_in(temp).args(["enqueue", kind]).output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
fn empty_log() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout("No operations\n");
}

#[test]
fn lists_in_enqueue_order() {
    let temp = TempDir::new().unwrap();
    let first = enqueue(&temp, "upload");
    let second = enqueue(&temp, "delete");

    outq_in(&temp).arg("list").assert().success().stdout(format!(
        "- [upload] (pending) {}\n- [delete] (pending) {}\n",
        first, second
    ));
}

#[test]
fn json_output() {
    let temp = TempDir::new().unwrap();
    let id = enqueue(&temp, "upload");

    let output = outq_in(&temp)
        .args(["list", "--output", "json"])
        .output()
        .unwrap();
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["operations"][0]["id"], id.as_str());
    assert_eq!(listing["operations"].as_array().unwrap().len(), 1);
}

#[test]
fn rejects_unknown_format() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp)
        .args(["list", "-o", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("yaml"));
}

#[test]
fn corrupted_log_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("operations.jsonl"),
        "garbage\n{\"op\":\"remove\",\"id\":\"1-0\"}\n",
    )
    .unwrap();

    outq_in(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupted log at line 1"));
}
