// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict detection and resolution between two collection replicas.
//!
//! A conflict exists when both replicas changed since the last sync this
//! device confirmed and they no longer hold the same content. Resolution is
//! always an explicit choice between three transforms:
//!
//! - `keep-local`: take this device's collection
//! - `keep-remote`: take the remote collection
//! - `merge`: union entries by id; for ids on both sides the newer edit wins,
//!   ties go to local; custom genres and moods are unioned
//!
//! Every transform stamps `lastUpdated` with the resolution time.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::{push_unique, Collection, Entry};
use crate::error::{Error, Result};

/// Who diverged and when. Produced transiently, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub local_device_id: String,
    pub remote_device_id: String,
    pub local_timestamp: DateTime<Utc>,
    pub remote_timestamp: DateTime<Utc>,
}

/// One side of a comparison.
#[derive(Debug, Clone, Copy)]
pub struct Replica<'a> {
    pub device_id: &'a str,
    pub modified: DateTime<Utc>,
    pub collection: &'a Collection,
}

/// The three ways a conflict can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    KeepLocal,
    KeepRemote,
    Merge,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::KeepLocal => "keep-local",
            Resolution::KeepRemote => "keep-remote",
            Resolution::Merge => "merge",
        }
    }

    pub fn all() -> [Resolution; 3] {
        [Resolution::KeepLocal, Resolution::KeepRemote, Resolution::Merge]
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keep-local" | "local" => Ok(Resolution::KeepLocal),
            "keep-remote" | "remote" => Ok(Resolution::KeepRemote),
            "merge" => Ok(Resolution::Merge),
            _ => Err(Error::InvalidInput(format!(
                "invalid resolution: '{s}'\n  hint: valid resolutions are: keep-local, keep-remote, merge"
            ))),
        }
    }
}

/// Decides whether two replicas conflict.
///
/// With no confirmed sync on record there is nothing to diverge from: the
/// remote replica is authoritative and no conflict is reported.
pub fn detect(
    local: &Replica<'_>,
    remote: &Replica<'_>,
    last_sync: Option<DateTime<Utc>>,
) -> Option<ConflictInfo> {
    let last_sync = last_sync?;
    if local.modified <= last_sync || remote.modified <= last_sync {
        return None;
    }
    if local.collection.same_content(remote.collection) {
        return None;
    }
    Some(ConflictInfo {
        local_device_id: local.device_id.to_string(),
        remote_device_id: remote.device_id.to_string(),
        local_timestamp: local.modified,
        remote_timestamp: remote.modified,
    })
}

/// Applies a resolution, producing the collection both replicas adopt.
pub fn resolve(
    resolution: Resolution,
    local: &Collection,
    remote: &Collection,
    now: DateTime<Utc>,
) -> Collection {
    let mut resolved = match resolution {
        Resolution::KeepLocal => local.clone(),
        Resolution::KeepRemote => remote.clone(),
        Resolution::Merge => merge(local, remote),
    };
    resolved.last_updated = now;
    resolved
}

/// Unions two collections by entry id.
///
/// Local entries keep their order; remote-only entries follow in remote
/// order. Custom tags are unioned in first-seen order.
pub fn merge(local: &Collection, remote: &Collection) -> Collection {
    let remote_by_id: HashMap<&str, &Entry> =
        remote.audiobooks.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut audiobooks = Vec::with_capacity(local.len().max(remote.len()));
    for entry in &local.audiobooks {
        let winner = match remote_by_id.get(entry.id.as_str()) {
            Some(theirs) if remote_is_newer(entry, theirs) => (*theirs).clone(),
            _ => entry.clone(),
        };
        audiobooks.push(winner);
    }
    for entry in &remote.audiobooks {
        if !local.contains(&entry.id) {
            audiobooks.push(entry.clone());
        }
    }

    let mut custom_genres = local.custom_genres.clone();
    for genre in &remote.custom_genres {
        push_unique(&mut custom_genres, genre);
    }
    let mut custom_moods = local.custom_moods.clone();
    for mood in &remote.custom_moods {
        push_unique(&mut custom_moods, mood);
    }

    Collection {
        version: local.version.clone(),
        last_updated: local.last_updated.max(remote.last_updated),
        audiobooks,
        custom_genres,
        custom_moods,
        updated_by: None,
    }
}

/// Entries without an edit timestamp lose to any timestamped edit.
fn remote_is_newer(ours: &Entry, theirs: &Entry) -> bool {
    match (ours.edited_at(), theirs.edited_at()) {
        (Some(a), Some(b)) => b > a,
        (None, Some(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
