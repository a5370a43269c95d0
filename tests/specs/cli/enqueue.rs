// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outq enqueue`.

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

/// Runs outq against a log and an empty config inside `temp`.
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

fn list_json(temp: &TempDir) -> serde_json::Value {
    let output = outq_in(temp)
        .args(["list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn prints_new_operation_id() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp)
        .args(["enqueue", "upload", r#"{"photo":"a.jpg"}"#])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\d+-\d+\n$").unwrap());
}

#[test]
fn payload_is_stored_verbatim() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp)
        .args(["enqueue", "upload", r#"{"photo":"a.jpg","tags":["x"]}"#])
        .assert()
        .success();

    let listing = list_json(&temp);
    let op = &listing["operations"][0];
    assert_eq!(op["kind"], "upload");
    assert_eq!(op["payload"]["photo"], "a.jpg");
    assert_eq!(op["payload"]["tags"][0], "x");
    assert_eq!(op["status"]["state"], "pending");
    assert_eq!(op["attempts"], 0);
}

#[test]
fn missing_payload_is_null() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp).args(["enqueue", "ping"]).assert().success();
    assert!(list_json(&temp)["operations"][0]["payload"].is_null());
}

#[test]
fn ids_increase() {
    let temp = TempDir::new().unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let output = outq_in(&temp).args(["enqueue", "ping"]).output().unwrap();
        ids.push(String::from_utf8(output.stdout).unwrap().trim().to_string());
    }

    let listed: Vec<String> = list_json(&temp)["operations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(listed, ids);
}

#[test]
fn invalid_payload_fails() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp)
        .args(["enqueue", "upload", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: invalid payload"));
    outq_in(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout("No operations\n");
}

#[test]
fn kind_with_whitespace_fails() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp)
        .args(["enqueue", "two words"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid operation kind"));
}

#[test]
fn empty_kind_fails() {
    let temp = TempDir::new().unwrap();
    outq_in(&temp).args(["enqueue", ""]).assert().failure();
}
