// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for crash recovery and log maintenance.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn outq() -> Command {
    cargo_bin_cmd!("outq")
}

struct Fixture {
    temp: TempDir,
}

impl Fixture {
    fn new(config: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let fixture = Fixture { temp };
        fixture.write_config(config);
        fixture
    }

    fn write_config(&self, config: &str) {
        std::fs::write(self.temp.path().join("config.toml"), config).unwrap();
    }

    fn log(&self) -> PathBuf {
        self.temp.path().join("operations.jsonl")
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--log".to_string(),
            self.log().display().to_string(),
            "--config".to_string(),
            self.temp.path().join("config.toml").display().to_string(),
        ]
    }

    fn cmd(&self) -> Command {
        let mut cmd = outq();
        cmd.args(self.args());
        cmd
    }

    fn list(&self) -> String {
        let output = self.cmd().arg("list").output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    }

    fn line_count(&self) -> usize {
        std::fs::read_to_string(self.log()).unwrap().lines().count()
    }
}

const APPEND: &str = r#"{"op":"append","operation":{"id":"1000-0","kind":"sync","payload":{"n":1},"created_at":"2026-01-01T00:00:00Z","attempts":0,"status":{"state":"pending"}}}"#;
const MARK_IN_FLIGHT: &str =
    r#"{"op":"update","id":"1000-0","status":{"state":"in_flight"},"attempts":0}"#;

#[test]
fn in_flight_operation_is_delivered_again() {
    let scratch = TempDir::new().unwrap();
    let marker = scratch.path().join("delivered");
    let fixture = Fixture::new(&format!(
        "[handlers]\nsync = 'cat > {}'\n",
        marker.display()
    ));
    std::fs::write(fixture.log(), format!("{}\n{}\n", APPEND, MARK_IN_FLIGHT)).unwrap();
    assert_eq!(fixture.list(), "- [sync] (in_flight) 1000-0\n");

    fixture
        .cmd()
        .arg("drain")
        .assert()
        .success()
        .stdout("Delivered 1 operation(s)\n");

    assert_eq!(std::fs::read_to_string(&marker).unwrap(), r#"{"n":1}"#);
    assert_eq!(fixture.list(), "No operations\n");
}

#[test]
fn killed_drain_is_resumed() {
    let fixture = Fixture::new("[handlers]\nsync = 'sleep 5'\n");
    fixture.cmd().args(["enqueue", "sync", "1"]).assert().success();

    let mut drain = std::process::Command::new(env!("CARGO_BIN_EXE_outq"))
        .args(fixture.args())
        .arg("drain")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !fixture.list().contains("(in_flight)") {
        assert!(Instant::now() < deadline, "drain never started");
        std::thread::sleep(Duration::from_millis(20));
    }

    // The running drain owns the log
    fixture
        .cmd()
        .args(["enqueue", "sync", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked by another process"));

    drain.kill().unwrap();
    drain.wait().unwrap();

    fixture.write_config("[handlers]\nsync = 'true'\n");
    fixture
        .cmd()
        .arg("drain")
        .assert()
        .success()
        .stdout("Delivered 1 operation(s)\n");
    assert_eq!(fixture.list(), "No operations\n");
}

#[test]
fn torn_tail_is_dropped() {
    let fixture = Fixture::new("");
    std::fs::write(
        fixture.log(),
        format!("{}\n{{\"op\":\"append\",\"operation\":{{\"id\"", APPEND),
    )
    .unwrap();
    assert_eq!(fixture.list(), "- [sync] (pending) 1000-0\n");

    fixture.cmd().args(["enqueue", "sync"]).assert().success();
    assert_eq!(fixture.list().lines().count(), 2);
    assert_eq!(fixture.line_count(), 2);
}

#[test]
fn compact_keeps_only_live_records() {
    let fixture = Fixture::new("max_attempts = 1\n[handlers]\nok = 'true'\nbad = 'exit 1'\n");
    for kind in ["ok", "bad", "ok", "ok"] {
        fixture.cmd().args(["enqueue", kind]).assert().success();
    }
    fixture.cmd().arg("drain").assert().success();
    let before = fixture.list();
    assert!(fixture.line_count() > 1);

    fixture
        .cmd()
        .arg("compact")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Compacted "));

    assert_eq!(fixture.line_count(), 1);
    assert_eq!(fixture.list(), before);
}

#[test]
fn corrupt_record_is_not_overwritten() {
    let fixture = Fixture::new("");
    let content = format!("not json\n{}\n", APPEND);
    std::fs::write(fixture.log(), &content).unwrap();

    fixture
        .cmd()
        .args(["enqueue", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupted log at line 1"));
    assert_eq!(std::fs::read_to_string(fixture.log()).unwrap(), content);
}
