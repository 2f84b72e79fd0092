// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for shelf-core operations.

use thiserror::Error;

use crate::classify::ErrorCategory;

/// All possible errors that can occur in shelf-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("audiobook not found: {0}")]
    EntryNotFound(String),

    #[error("duplicate audiobook id: {0}\n  hint: ids are generated once and never reused")]
    DuplicateEntry(String),

    #[error("invalid rating {0}\n  hint: rating must be 0 (unrated) or between 1 and 5")]
    InvalidRating(u8),

    #[error("invalid price {0}\n  hint: price must be a finite number >= 0")]
    InvalidPrice(f64),

    #[error("invalid operation type: '{0}'\n  hint: valid types are: add, update, delete, sync")]
    InvalidOpKind(String),

    #[error("invalid field: '{0}'\n  hint: valid fields are: title, author, narrator, url, image, length, releaseDate, rating, price")]
    InvalidField(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

impl Error {
    /// Category used when this error crosses into the sync layer.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::EntryNotFound(_) => ErrorCategory::NotFound,
            Error::Json(_) | Error::CorruptedData(_) => ErrorCategory::Storage,
            _ => ErrorCategory::Validation,
        }
    }
}

/// A specialized Result type for shelf-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
