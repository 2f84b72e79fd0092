// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use shelf_core::ErrorCategory;
use thiserror::Error;

use crate::sync::{CacheError, QueueError, SyncError, TransportError};

/// All possible errors that can occur in the shelf CLI.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'shelf init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("conflict prompt requires a terminal (TTY)\n  hint: pass --on-conflict keep-local, keep-remote or merge")]
    TtyRequired,

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Catalog(#[from] shelf_core::Error),

    #[error("storage error: {0}")]
    Store(#[from] shelf_core::StoreError),

    #[error("http client error: {0}")]
    Transport(#[from] TransportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Category for errors that came out of the sync layer.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Error::Sync(e) => Some(e.category()),
            Error::Cache(e) => Some(e.category()),
            Error::Queue(e) => Some(e.category()),
            Error::Catalog(e) => Some(e.category()),
            Error::Store(e) => Some(e.category()),
            _ => None,
        }
    }

    /// Suggested next steps, printed under the error message.
    pub fn hints(&self) -> Vec<String> {
        match self {
            Error::Sync(e) => e.recovery_actions(),
            _ => Vec::new(),
        }
    }
}

/// A specialized Result type for shelfrs operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
