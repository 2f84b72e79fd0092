// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Prefix of every generated audiobook id.
pub const ID_PREFIX: &str = "ab";

/// Generate an audiobook ID from title, author and creation time.
/// Format: ab-{hash} where hash is first 8 hex chars of SHA256(title + author + timestamp)
pub fn generate_id(title: &str, author: &str, added_at: &DateTime<Utc>) -> String {
    let input = format!("{}\u{1f}{}{}", title, author, added_at.to_rfc3339());
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    format!("{}-{}", ID_PREFIX, short_hash)
}

/// Generate an ID not accepted by `exists`, appending an incrementing suffix
/// on collision.
pub fn generate_unique_id<F>(
    title: &str,
    author: &str,
    added_at: &DateTime<Utc>,
    exists: F,
) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate_id(title, author, added_at);

    if !exists(&base_id) {
        return base_id;
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
