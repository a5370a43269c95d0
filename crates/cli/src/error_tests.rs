// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use oq_core::OperationId;
use yare::parameterized;

#[parameterized(
    already_started = { Error::AlreadyStarted, "already started" },
    unknown_kind = { Error::UnknownKind("mail.send".into()), "no handler registered for kind 'mail.send'" },
    config = { Error::Config("bad value".into()), "config error: bad value" },
    address = { Error::InvalidAddress("nope".into()), "invalid probe address 'nope'" },
    timeout = { Error::DrainTimeout { secs: 5, pending: 2 }, "timed out after 5s with 2 operation(s)" },
)]
fn display_contains(err: Error, expected: &str) {
    assert!(
        err.to_string().contains(expected),
        "'{}' should contain '{}'",
        err,
        expected
    );
}

#[test]
fn core_errors_are_transparent() {
    let core = oq_core::Error::OperationNotFound(OperationId::new(7, 1));
    let err: Error = core.into();
    assert_eq!(err.to_string(), "operation not found: 7-1");
}

#[test]
fn storage_classification_follows_core() {
    let storage: Error = oq_core::Error::Storage("disk full".into()).into();
    assert!(storage.is_storage());

    let not_found: Error = oq_core::Error::OperationNotFound(OperationId::new(1, 0)).into();
    assert!(!not_found.is_storage());

    assert!(!Error::AlreadyStarted.is_storage());
}
