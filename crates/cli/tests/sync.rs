// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
use common::*;

#[test]
fn offline_sync_fails_with_hints() {
    let temp = init_temp();
    add_book(&temp, "Dune", "Frank Herbert");

    shelf_in(&temp)
        .args(["sync", "--on-conflict", "merge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"))
        .stderr(predicate::str::contains("hint: Check your internet connection"));
}

#[test]
fn offline_sync_keeps_pending_changes() {
    let temp = init_temp();
    let id = add_book(&temp, "Dune", "Frank Herbert");
    shelf_in(&temp).arg("sync").assert().failure();

    shelf_in(&temp)
        .arg("queue")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("add     {}", id)));
    shelf_in(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dune"));
}

#[test]
fn offline_sync_is_recorded_in_status() {
    let temp = init_temp();
    add_book(&temp, "Dune", "Frank Herbert");
    shelf_in(&temp).arg("sync").assert().failure();

    shelf_in(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last sync: never"))
        .stdout(predicate::str::contains("Catalog:   1 audiobooks (error)"))
        .stdout(predicate::str::contains("Last error:"));
}

#[test]
fn verbose_logs_to_stderr() {
    let temp = init_temp();

    shelf_in(&temp)
        .args(["-vv", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sync failed"));
}

#[test]
fn rejects_unknown_conflict_choice() {
    let temp = init_temp();

    shelf_in(&temp).args(["sync", "--on-conflict", "coin-flip"]).assert().failure();
}
