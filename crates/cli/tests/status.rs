// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
use common::*;

#[test]
fn fresh_status() {
    let temp = init_temp();

    shelf_in(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Document:  none"))
        .stdout(predicate::str::contains("Pending:   0 operations"));
}

#[test]
fn status_json() {
    let temp = init_temp();
    add_book(&temp, "Dune", "Frank Herbert");

    let output = shelf_in(&temp).args(["status", "-o", "json"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["cache"]["entryCount"], 1);
    assert_eq!(value["cache"]["syncStatus"], "pending");
    assert_eq!(value["queue"]["total"], 1);
}

#[test]
fn queue_json_lists_operations() {
    let temp = init_temp();
    let id = add_book(&temp, "Dune", "Frank Herbert");
    shelf_in(&temp).args(["edit", &id, "rating", "5"]).assert().success();

    let output = shelf_in(&temp).args(["queue", "-o", "json"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ops = value["operations"].as_array().unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0]["type"], "add");
    assert_eq!(ops[1]["type"], "update");
}

#[test]
fn empty_queue() {
    let temp = init_temp();

    shelf_in(&temp)
        .arg("queue")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending operations"));
}

#[test]
fn cache_stats_and_clear() {
    let temp = init_temp();
    add_book(&temp, "Dune", "Frank Herbert");

    shelf_in(&temp)
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:       1"));

    shelf_in(&temp)
        .args(["cache", "clear", "--queue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared cache and pending operations"));

    shelf_in(&temp)
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached catalog"));
    shelf_in(&temp)
        .arg("queue")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending operations"));
}

#[test]
fn cache_cleanup_keeps_fresh_snapshot() {
    let temp = init_temp();
    add_book(&temp, "Dune", "Frank Herbert");

    shelf_in(&temp)
        .args(["cache", "cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 stale cache entries"));
}
