// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! Variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `SHELF_DIR` if set and non-empty.
pub fn shelf_dir() -> Option<PathBuf> {
    std::env::var(vars::SHELF_DIR).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the log filter from `SHELF_LOG`, if set.
pub fn log_filter() -> Option<String> {
    std::env::var(vars::SHELF_LOG).ok().filter(|v| !v.trim().is_empty())
}

/// Reads an API token from the named variable. Empty values count as unset.
pub fn token(var: &str) -> Option<String> {
    std::env::var(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
