// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The synchronized audiobook collection.
//!
//! The JSON form of [`Collection`] is both the remote document payload and the
//! import/export file format:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "lastUpdated": "2026-01-01T00:00:00Z",
//!   "audiobooks": [{ "id": "...", "title": "...", ... }],
//!   "customGenres": [],
//!   "customMoods": []
//! }
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Schema version written into new collections.
pub const COLLECTION_VERSION: &str = "1.0";

/// Highest allowed rating. Zero means unrated.
pub const MAX_RATING: u8 = 5;

/// A single catalog entry.
///
/// Fields this version does not know about are kept in `extra` so that a
/// device running an older build never strips data written by a newer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub narrator: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Creates an entry with only the required fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Entry {
            id: id.into(),
            title: title.into(),
            author: String::new(),
            narrator: String::new(),
            url: String::new(),
            image: String::new(),
            length: String::new(),
            release_date: String::new(),
            rating: 0,
            price: 0.0,
            genres: Vec::new(),
            moods: Vec::new(),
            added_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Timestamp of the last edit, used to pick a winner when merging.
    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.added_at)
    }

    /// Checks field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidInput("audiobook id cannot be empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput(format!("audiobook {} has an empty title", self.id)));
        }
        if self.rating > MAX_RATING {
            return Err(Error::InvalidRating(self.rating));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::InvalidPrice(self.price));
        }
        Ok(())
    }

    /// Sets a scalar field by its wire name.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "title" => self.title = value.to_string(),
            "author" => self.author = value.to_string(),
            "narrator" => self.narrator = value.to_string(),
            "url" => self.url = value.to_string(),
            "image" => self.image = value.to_string(),
            "length" => self.length = value.to_string(),
            "releaseDate" | "release_date" => self.release_date = value.to_string(),
            "rating" => {
                self.rating = value.parse().map_err(|_| {
                    Error::InvalidInput(format!("rating must be a number, got '{value}'"))
                })?;
            }
            "price" => {
                self.price = value.parse().map_err(|_| {
                    Error::InvalidInput(format!("price must be a number, got '{value}'"))
                })?;
            }
            other => return Err(Error::InvalidField(other.to_string())),
        }
        self.validate()
    }
}

/// The full catalog as stored locally and remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub audiobooks: Vec<Entry>,
    #[serde(default)]
    pub custom_genres: Vec<String>,
    #[serde(default)]
    pub custom_moods: Vec<String>,
    /// Device that last pushed this collection. Not part of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Collection {
    /// The bundled default: an empty catalog.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Collection {
            version: COLLECTION_VERSION.to_string(),
            last_updated: now,
            audiobooks: Vec::new(),
            custom_genres: Vec::new(),
            custom_moods: Vec::new(),
            updated_by: None,
        }
    }

    /// Parses a collection from its JSON file form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes to pretty-printed JSON, the form used for remote files.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the document-level shape and every entry.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::InvalidInput("collection version cannot be empty".to_string()));
        }
        let mut seen = HashSet::with_capacity(self.audiobooks.len());
        for entry in &self.audiobooks {
            entry.validate()?;
            if !seen.insert(entry.id.as_str()) {
                return Err(Error::DuplicateEntry(entry.id.clone()));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.audiobooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audiobooks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.audiobooks.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Moves `lastUpdated` forward to `now`, never backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_updated {
            self.last_updated = now;
        }
    }

    /// Adds a new entry. Fails if the id is already present.
    pub fn insert(&mut self, mut entry: Entry, now: DateTime<Utc>) -> Result<()> {
        entry.validate()?;
        if self.contains(&entry.id) {
            return Err(Error::DuplicateEntry(entry.id));
        }
        if entry.added_at.is_none() {
            entry.added_at = Some(now);
        }
        self.audiobooks.push(entry);
        self.touch(now);
        Ok(())
    }

    /// Replaces an existing entry, returning the previous version.
    pub fn replace(&mut self, mut entry: Entry, now: DateTime<Utc>) -> Result<Entry> {
        entry.validate()?;
        let slot = self
            .audiobooks
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| Error::EntryNotFound(entry.id.clone()))?;
        if entry.added_at.is_none() {
            entry.added_at = slot.added_at;
        }
        entry.updated_at = Some(now);
        let previous = std::mem::replace(slot, entry);
        self.touch(now);
        Ok(previous)
    }

    /// Removes an entry by id, returning it.
    pub fn remove(&mut self, id: &str, now: DateTime<Utc>) -> Result<Entry> {
        let index = self
            .audiobooks
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::EntryNotFound(id.to_string()))?;
        let removed = self.audiobooks.remove(index);
        self.touch(now);
        Ok(removed)
    }

    /// Inserts or replaces by id without touching timestamps.
    ///
    /// Used when replaying queued mutations, where the entry already carries
    /// its own edit timestamps.
    pub fn upsert(&mut self, entry: Entry) {
        match self.audiobooks.iter_mut().find(|e| e.id == entry.id) {
            Some(slot) => *slot = entry,
            None => self.audiobooks.push(entry),
        }
    }

    /// Removes by id if present. Returns whether anything was removed.
    pub fn discard(&mut self, id: &str) -> bool {
        let before = self.audiobooks.len();
        self.audiobooks.retain(|e| e.id != id);
        self.audiobooks.len() != before
    }

    /// Adds a custom genre. Returns false if it already existed.
    pub fn add_custom_genre(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        let added = push_unique(&mut self.custom_genres, name);
        if added {
            self.touch(now);
        }
        added
    }

    /// Adds a custom mood. Returns false if it already existed.
    pub fn add_custom_mood(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        let added = push_unique(&mut self.custom_moods, name);
        if added {
            self.touch(now);
        }
        added
    }

    /// Canonical form used for content comparison.
    ///
    /// Object keys compare order-independently as `serde_json::Value`;
    /// entries are sorted by id and tags sorted, and `lastUpdated` and
    /// `updatedBy` are dropped so that two replicas holding the same catalog compare equal.
    pub fn normalized(&self) -> Value {
        let mut entries: Vec<&Entry> = self.audiobooks.iter().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        let mut genres = self.custom_genres.clone();
        genres.sort();
        let mut moods = self.custom_moods.clone();
        moods.sort();

        serde_json::json!({
            "version": self.version,
            "audiobooks": entries,
            "customGenres": genres,
            "customMoods": moods,
        })
    }

    /// True when both collections hold the same catalog content.
    pub fn same_content(&self, other: &Collection) -> bool {
        self.normalized() == other.normalized()
    }
}

/// Appends `name` unless an equal value is already present.
pub(crate) fn push_unique(list: &mut Vec<String>, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || list.iter().any(|existing| existing == name) {
        return false;
    }
    list.push(name.to_string());
    true
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
