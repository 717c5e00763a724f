// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests that need no running store

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn lk() -> Command {
    let mut cmd = Command::cargo_bin("lk").unwrap();
    cmd.env_remove("LK_REDIS_URL").env("RUST_LOG", "off");
    cmd
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_help_lists_commands() {
    lk().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("hold"))
        .stdout(predicate::str::contains("unlock"))
        .stdout(predicate::str::contains("contend"))
        .stdout(predicate::str::contains("--redis-url"));
}

#[test]
fn test_hold_help() {
    lk().args(["hold", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--for"))
        .stdout(predicate::str::contains("--expiry"));
}

#[test]
fn test_contend_help() {
    lk().args(["contend", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tasks"))
        .stdout(predicate::str::contains("--rounds"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_unlock_requires_token() {
    lk().args(["unlock", "orders"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--token"));
}

#[test]
fn test_hold_rejects_bad_duration() {
    lk().args(["hold", "orders", "--for", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--for"));
}

#[test]
fn test_malformed_config_fails_before_connecting() {
    let file = config_file("wait_timeout = [");
    lk().args(["--config", file.path().to_str().unwrap(), "unlock", "k", "--token", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse config"));
}

#[test]
fn test_invalid_config_values_are_rejected() {
    let file = config_file("wait_timeout = \"0s\"\n");
    lk().args(["--config", file.path().to_str().unwrap(), "unlock", "k", "--token", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wait_timeout must be greater than zero"));
}

#[test]
fn test_missing_config_file_is_reported() {
    lk().args(["--config", "/nonexistent/lk.toml", "unlock", "k", "--token", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/lk.toml"));
}

#[test]
fn test_unreachable_store_is_reported() {
    lk().args(["--redis-url", "redis://127.0.0.1:1", "unlock", "k", "--token", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot reach store at redis://127.0.0.1:1"));
}
