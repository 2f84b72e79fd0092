// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations.
//!
//! Every local change to the collection is recorded as a [`QueueOperation`]
//! until it has been applied to the remote document. Operations are
//! identified by `(type, id)`; re-recording the same identity replaces the
//! payload instead of adding a second entry.
//!
//! Replaying an operation onto a collection is idempotent: adds and updates
//! upsert by id, deletes remove by id, and syncs union the custom tag lists.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::{push_unique, Collection, Entry};
use crate::error::{Error, Result};

/// Identity used for the collection-level `sync` operation.
pub const SYNC_OP_ID: &str = "collection";

/// The kind of mutation an operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Update,
    Delete,
    Sync,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Update => "update",
            OpKind::Delete => "delete",
            OpKind::Sync => "sync",
        }
    }

    pub fn all() -> [OpKind; 4] {
        [OpKind::Add, OpKind::Update, OpKind::Delete, OpKind::Sync]
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OpKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(OpKind::Add),
            "update" => Ok(OpKind::Update),
            "delete" => Ok(OpKind::Delete),
            "sync" => Ok(OpKind::Sync),
            _ => Err(Error::InvalidOpKind(s.to_string())),
        }
    }
}

/// A pending mutation with its retry accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOperation {
    #[serde(rename = "type")]
    pub kind: OpKind,
    pub id: String,
    pub data: Value,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub last_retry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueueOperation {
    pub fn new(kind: OpKind, id: impl Into<String>, data: Value, now: DateTime<Utc>) -> Self {
        QueueOperation {
            kind,
            id: id.into(),
            data,
            queued_at: now,
            last_retry_at: None,
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn add(entry: &Entry, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self::new(OpKind::Add, entry.id.clone(), serde_json::to_value(entry)?, now))
    }

    pub fn update(entry: &Entry, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self::new(OpKind::Update, entry.id.clone(), serde_json::to_value(entry)?, now))
    }

    pub fn delete(id: &str, now: DateTime<Utc>) -> Self {
        Self::new(OpKind::Delete, id, serde_json::json!({ "id": id }), now)
    }

    /// Collection-level sync carrying the custom tag lists.
    pub fn sync(collection: &Collection, now: DateTime<Utc>) -> Self {
        Self::new(
            OpKind::Sync,
            SYNC_OP_ID,
            serde_json::json!({
                "customGenres": collection.custom_genres,
                "customMoods": collection.custom_moods,
            }),
            now,
        )
    }

    /// The deduplication key.
    pub fn identity(&self) -> (OpKind, &str) {
        (self.kind, self.id.as_str())
    }

    pub fn same_identity(&self, other: &QueueOperation) -> bool {
        self.identity() == other.identity()
    }

    /// Replays this operation onto `collection`.
    ///
    /// Returns whether the collection changed. Timestamps are left to the
    /// caller.
    pub fn apply_to(&self, collection: &mut Collection) -> Result<bool> {
        match self.kind {
            OpKind::Add | OpKind::Update => {
                let entry: Entry = serde_json::from_value(self.data.clone())?;
                if entry.id != self.id {
                    return Err(Error::CorruptedData(format!(
                        "{} operation for '{}' carries entry '{}'",
                        self.kind, self.id, entry.id
                    )));
                }
                entry.validate()?;
                if collection.get(&entry.id) == Some(&entry) {
                    return Ok(false);
                }
                collection.upsert(entry);
                Ok(true)
            }
            OpKind::Delete => Ok(collection.discard(&self.id)),
            OpKind::Sync => {
                let mut changed = false;
                for genre in string_list(&self.data, "customGenres") {
                    changed |= push_unique(&mut collection.custom_genres, genre);
                }
                for mood in string_list(&self.data, "customMoods") {
                    changed |= push_unique(&mut collection.custom_moods, mood);
                }
                Ok(changed)
            }
        }
    }
}

fn string_list<'a>(data: &'a Value, key: &str) -> impl Iterator<Item = &'a str> {
    data.get(key).and_then(Value::as_array).into_iter().flatten().filter_map(Value::as_str)
}

#[cfg(test)]
#[path = "op_tests.rs"]
mod tests;
