// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outq drain`, `outq retry` and `outq purge`.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn outq() -> Command {
    cargo_bin_cmd!("outq")
}

struct Queue {
    temp: TempDir,
}

impl Queue {
    /// A log plus a config whose `[handlers]` table holds `handlers`.
    fn with_handlers(settings: &str, handlers: &[(&str, &str)]) -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = format!("{}\n[handlers]\n", settings);
        for (kind, command) in handlers {
            config.push_str(&format!("{} = '{}'\n", kind, command));
        }
        std::fs::write(temp.path().join("config.toml"), config).unwrap();
        Queue { temp }
    }

    fn cmd(&self) -> Command {
        let mut cmd = outq();
        cmd.arg("--log")
            .arg(self.temp.path().join("operations.jsonl"))
            .arg("--config")
            .arg(self.temp.path().join("config.toml"));
        cmd
    }

    fn enqueue(&self, kind: &str, payload: &str) -> String {
        let output = self.cmd().args(["enqueue", kind, payload]).output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }
}

/// An address nothing listens on.
fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

#[test]
fn delivers_in_enqueue_order() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out.txt").display().to_string();
    let queue = Queue::with_handlers(
        "",
        &[("append", format!("cat >> {}; echo >> {}", out, out).as_str())],
    );
    queue.enqueue("append", r#""first""#);
    queue.enqueue("append", r#""second""#);
    queue.enqueue("append", r#""third""#);

    queue
        .cmd()
        .arg("drain")
        .assert()
        .success()
        .stdout("Delivered 3 operation(s)\n");

    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "\"first\"\n\"second\"\n\"third\"\n"
    );
    queue.cmd().arg("list").assert().stdout("No operations\n");
}

#[test]
fn handler_sees_operation_environment() {
    let scratch = TempDir::new().unwrap();
    let out = scratch.path().join("env.txt").display().to_string();
    let queue = Queue::with_handlers(
        "",
        &[(
            "note",
            format!("echo $OUTQ_OPERATION_KIND $OUTQ_OPERATION_ID > {}", out).as_str(),
        )],
    );
    let id = queue.enqueue("note", "{}");

    queue.cmd().arg("drain").assert().success();
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        format!("note {}\n", id)
    );
}

#[test]
fn nothing_to_deliver() {
    let queue = Queue::with_handlers("", &[]);
    queue
        .cmd()
        .arg("drain")
        .assert()
        .success()
        .stdout("Nothing to deliver\n");
}

#[test]
fn transient_failure_is_retried() {
    let scratch = TempDir::new().unwrap();
    let marker = scratch.path().join("seen").display().to_string();
    // Fails the first time, succeeds once the marker exists
    let command = format!("test -e {m} || {{ touch {m}; exit 1; }}", m = marker);
    let queue = Queue::with_handlers(
        "base_delay_ms = 10\nmax_delay_ms = 10\n",
        &[("flaky", command.as_str())],
    );
    queue.enqueue("flaky", "1");

    queue
        .cmd()
        .arg("drain")
        .assert()
        .success()
        .stdout("Delivered 1 operation(s)\n");
}

#[test]
fn terminal_failure_is_skipped_then_retried_or_purged() {
    let queue = Queue::with_handlers(
        "max_attempts = 1\n",
        &[("ok", "true"), ("broken", "exit 1")],
    );
    let broken = queue.enqueue("broken", "1");
    let other = queue.enqueue("broken", "2");
    queue.enqueue("ok", "3");

    queue
        .cmd()
        .arg("drain")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Delivered 1 operation(s)\nFailed 2 operation(s)\nLast error: ",
        ));

    queue
        .cmd()
        .arg("list")
        .assert()
        .stdout(predicate::str::contains(format!(
            "- [broken] (failed, 1 attempt) {}: gave up after 1 attempts: command exited with 1",
            broken
        )));

    queue
        .cmd()
        .args(["retry", &broken])
        .assert()
        .success()
        .stdout(format!("Queued {} for retry\n", broken));
    queue
        .cmd()
        .arg("list")
        .assert()
        .stdout(predicate::str::contains(format!("- [broken] (pending) {}", broken)));

    queue
        .cmd()
        .args(["purge", &other])
        .assert()
        .success()
        .stdout(format!("Purged {}\n", other));
    queue
        .cmd()
        .args(["status"])
        .assert()
        .stdout("Pending: 1\nFailed: 0\n");
}

#[test]
fn retry_requires_failed_operation() {
    let queue = Queue::with_handlers("", &[]);
    let id = queue.enqueue("ok", "1");

    queue
        .cmd()
        .args(["retry", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not terminally failed"));
    queue
        .cmd()
        .args(["purge", "1-0"])
        .assert()
        .failure()
        .stderr("error: operation not found: 1-0\n");
    queue
        .cmd()
        .args(["purge", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid operation id"));
}

#[test]
fn unknown_kind_fails_terminally() {
    let queue = Queue::with_handlers("", &[("ok", "true")]);
    queue.enqueue("mystery", "1");

    queue
        .cmd()
        .arg("drain")
        .assert()
        .success()
        .stdout(predicate::str::contains("no handler registered for kind 'mystery'"));
}

#[test]
fn waits_for_reachable_probe() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let queue = Queue::with_handlers("debounce_ms = 10\n", &[("ok", "true")]);
    queue.enqueue("ok", "1");

    queue
        .cmd()
        .args(["drain", "--probe", &address, "--timeout", "30"])
        .assert()
        .success()
        .stdout("Delivered 1 operation(s)\n");
}

#[test]
fn unreachable_probe_times_out() {
    let settings = format!(
        "debounce_ms = 10\n[probe]\naddress = \"{}\"\ninterval_ms = 50\ntimeout_ms = 100\n",
        closed_address()
    );
    let queue = Queue::with_handlers(&settings, &[("ok", "true")]);
    let id = queue.enqueue("ok", "1");

    queue
        .cmd()
        .args(["drain", "--timeout", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "timed out after 1s with 1 operation(s) still pending",
        ));
    queue
        .cmd()
        .arg("list")
        .assert()
        .stdout(format!("- [ok] (pending) {}\n", id));
}

#[test]
fn invalid_probe_address() {
    let queue = Queue::with_handlers("", &[]);
    queue.enqueue("ok", "1");
    queue
        .cmd()
        .args(["drain", "--probe", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid probe address 'nowhere'"));
}
