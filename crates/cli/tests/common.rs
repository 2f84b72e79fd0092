// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Address nothing listens on, so every remote call fails to connect.
pub const UNREACHABLE_API: &str = "http://127.0.0.1:9";

pub fn shelf() -> Command {
    cargo_bin_cmd!("shelf")
}

/// `shelf` running in `temp`, isolated from the caller's environment and
/// per-user catalog.
pub fn shelf_in(temp: &TempDir) -> Command {
    let mut cmd = shelf();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env_remove("SHELF_DIR")
        .env_remove("SHELF_LOG")
        .env_remove("SHELF_TOKEN");
    cmd
}

/// Helper to create an initialized temp directory that cannot reach a remote.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    shelf_in(&temp).arg("init").assert().success();
    let config = format!(
        "[remote]\napi_url = \"{}\"\nrequest_timeout_secs = 2\n\n\
         [retry]\nmax_retries = 1\nbase_delay_ms = 1\nmax_delay_ms = 1\n",
        UNREACHABLE_API
    );
    std::fs::write(temp.path().join(".shelf/config.toml"), config).unwrap();
    temp
}

/// Helper to add an audiobook and return its ID
pub fn add_book(temp: &TempDir, title: &str, author: &str) -> String {
    let output = shelf_in(temp).args(["add", title, "-a", author]).output().unwrap();
    assert!(output.status.success(), "add failed: {:?}", output);

    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .find(|s| s.starts_with("ab-"))
        .unwrap()
        .trim_end_matches(':')
        .to_string()
}
