// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! On-device snapshot of the collection plus sync bookkeeping.
//!
//! Three independent keys are kept in the [`KeyValueStore`]:
//!
//! - [`CACHE_KEY`]: `{ metadata, data }` where `data` is the collection
//! - [`SYNC_METADATA_KEY`]: the last confirmed sync and the document id
//! - [`DEVICE_ID_KEY`]: this installation's identity, created once
//!
//! A snapshot that fails structural checks on load is treated as absent and
//! removed.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelf_core::{ClockSource, Collection, ErrorCategory, KeyValueStore, StoreError};

pub const CACHE_KEY: &str = "shelf.cache";
pub const SYNC_METADATA_KEY: &str = "shelf.sync_metadata";
pub const DEVICE_ID_KEY: &str = "shelf.device_id";

/// Keys with this prefix hold snapshots and are subject to [`LocalCache::cleanup`].
const CACHE_NAMESPACE: &str = CACHE_KEY;

/// Keys cleanup never touches, whatever their name.
const PROTECTED_KEYS: &[&str] = &[SYNC_METADATA_KEY, DEVICE_ID_KEY, super::queue::QUEUE_KEY];

/// Largest serialized snapshot accepted.
pub const MAX_CACHE_BYTES: usize = 5 * 1024 * 1024;

/// Snapshots older than this are evicted by cleanup.
pub const CACHE_MAX_AGE_DAYS: i64 = 7;

/// Format version written into snapshot metadata.
pub const CACHE_FORMAT_VERSION: &str = "1.0";

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Snapshot exceeds [`MAX_CACHE_BYTES`].
    #[error("catalog is {size} bytes, over the {limit} byte cache limit")]
    TooLarge { size: usize, limit: usize },

    /// The medium refused the write; cleanup already ran.
    #[error("local storage is full ({evicted} old snapshot(s) removed)\n  hint: retry the change")]
    StorageFull { evicted: usize },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CacheError::TooLarge { .. } | CacheError::StorageFull { .. } => {
                ErrorCategory::QuotaExceeded
            }
            CacheError::Store(e) => e.category(),
            CacheError::Json(_) => ErrorCategory::Storage,
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Where this device stands relative to the remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Never,
    Pending,
    Synced,
    Conflict,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Never => "never",
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Error => "error",
        }
    }
}

impl SyncStatus {
    /// Whether the snapshot may hold edits the remote has not seen.
    pub fn is_unsynced(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Conflict | SyncStatus::Error)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata stored alongside the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub version: String,
    pub last_modified: DateTime<Utc>,
    pub device_id: String,
    pub app_version: String,
    pub sync_status: SyncStatus,
}

/// Bookkeeping for the last confirmed sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    #[serde(default)]
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub last_remote_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// A loaded snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData {
    pub metadata: CacheMetadata,
    pub collection: Collection,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    metadata: CacheMetadata,
    data: Collection,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    metadata: CacheMetadata,
}

/// Options for [`LocalCache::save_data`].
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Stamp `lastModified` with the clock. When false the collection's own
    /// `lastUpdated` is recorded instead.
    pub update_timestamp: bool,
    /// Status to record; keeps the stored status when `None`.
    pub sync_status: Option<SyncStatus>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions { update_timestamp: true, sync_status: None }
    }
}

impl SaveOptions {
    /// Save that records the given status.
    pub fn with_status(sync_status: SyncStatus) -> Self {
        SaveOptions { sync_status: Some(sync_status), ..SaveOptions::default() }
    }
}

/// Summary for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub has_data: bool,
    pub size_bytes: usize,
    pub entry_count: usize,
    pub last_modified: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub device_id: Option<String>,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub document_id: Option<String>,
}

/// Durable local cache.
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn ClockSource>,
    device_id: OnceLock<String>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn ClockSource>) -> Self {
        LocalCache { store, clock, device_id: OnceLock::new() }
    }

    /// This installation's id, created and persisted on first use.
    pub fn device_id(&self) -> CacheResult<String> {
        if let Some(id) = self.device_id.get() {
            return Ok(id.clone());
        }

        let id = match self.store.get(DEVICE_ID_KEY)? {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => {
                let id = uuid::Uuid::new_v4().to_string();
                self.store.set(DEVICE_ID_KEY, &id)?;
                tracing::info!("created device id {}", id);
                id
            }
        };
        Ok(self.device_id.get_or_init(|| id).clone())
    }

    /// Writes `collection` as the current snapshot in a single write.
    pub fn save_data(
        &self,
        collection: &Collection,
        options: SaveOptions,
    ) -> CacheResult<CacheMetadata> {
        let sync_status = match options.sync_status {
            Some(status) => status,
            None => self.stored_metadata().map(|m| m.sync_status).unwrap_or_default(),
        };
        let last_modified =
            if options.update_timestamp { self.clock.now() } else { collection.last_updated };

        let metadata = CacheMetadata {
            version: CACHE_FORMAT_VERSION.to_string(),
            last_modified,
            device_id: self.device_id()?,
            app_version: APP_VERSION.to_string(),
            sync_status,
        };
        let snapshot = Snapshot { metadata, data: collection.clone() };
        let json = serde_json::to_string(&snapshot)?;

        if json.len() > MAX_CACHE_BYTES {
            return Err(CacheError::TooLarge { size: json.len(), limit: MAX_CACHE_BYTES });
        }

        match self.store.set(CACHE_KEY, &json) {
            Ok(()) => {
                tracing::debug!("cached {} entries ({} bytes)", collection.len(), json.len());
                Ok(snapshot.metadata)
            }
            Err(StoreError::QuotaExceeded(reason)) => {
                tracing::warn!("cache write hit storage quota: {}", reason);
                let evicted = self.cleanup().unwrap_or_else(|e| {
                    tracing::warn!("cleanup after quota failure failed: {}", e);
                    0
                });
                Err(CacheError::StorageFull { evicted })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Loads the snapshot, or `None` when absent or structurally invalid.
    pub fn load_data(&self) -> CacheResult<Option<CachedData>> {
        let Some(raw) = self.store.get(CACHE_KEY)? else {
            return Ok(None);
        };

        match parse_snapshot(&raw) {
            Ok(snapshot) => {
                Ok(Some(CachedData { metadata: snapshot.metadata, collection: snapshot.data }))
            }
            Err(reason) => {
                tracing::warn!("discarding invalid cache snapshot: {}", reason);
                self.discard_snapshot()?;
                Ok(None)
            }
        }
    }

    /// Removes only the snapshot.
    pub fn discard_snapshot(&self) -> CacheResult<()> {
        Ok(self.store.delete(CACHE_KEY)?)
    }

    /// Removes the snapshot and sync bookkeeping. The device id survives.
    pub fn clear_data(&self) -> CacheResult<()> {
        self.discard_snapshot()?;
        self.store.delete(SYNC_METADATA_KEY)?;
        Ok(())
    }

    pub fn has_data(&self) -> CacheResult<bool> {
        Ok(self.store.get(CACHE_KEY)?.is_some())
    }

    /// Sync bookkeeping; unreadable bookkeeping reads as empty.
    pub fn sync_metadata(&self) -> CacheResult<SyncMetadata> {
        let Some(raw) = self.store.get(SYNC_METADATA_KEY)? else {
            return Ok(SyncMetadata::default());
        };
        match serde_json::from_str(&raw) {
            Ok(meta) => Ok(meta),
            Err(e) => {
                tracing::warn!("ignoring unreadable sync metadata: {}", e);
                Ok(SyncMetadata::default())
            }
        }
    }

    /// Applies `patch` to the stored sync bookkeeping and persists it.
    pub fn update_sync_metadata(
        &self,
        patch: impl FnOnce(&mut SyncMetadata),
    ) -> CacheResult<SyncMetadata> {
        let mut meta = self.sync_metadata()?;
        patch(&mut meta);
        self.store.set(SYNC_METADATA_KEY, &serde_json::to_string(&meta)?)?;
        Ok(meta)
    }

    /// Rewrites the snapshot's status without touching anything else.
    ///
    /// Returns false when there is no valid snapshot to mark.
    pub fn set_sync_status(&self, status: SyncStatus) -> CacheResult<bool> {
        let Some(raw) = self.store.get(CACHE_KEY)? else {
            return Ok(false);
        };
        let Ok(mut snapshot) = parse_snapshot(&raw) else {
            return Ok(false);
        };
        if snapshot.metadata.sync_status == status {
            return Ok(true);
        }
        snapshot.metadata.sync_status = status;
        self.store.set(CACHE_KEY, &serde_json::to_string(&snapshot)?)?;
        Ok(true)
    }

    pub fn cache_stats(&self) -> CacheResult<CacheStats> {
        let raw = self.store.get(CACHE_KEY)?;
        let snapshot = raw.as_deref().and_then(|r| parse_snapshot(r).ok());
        let sync = self.sync_metadata()?;

        Ok(CacheStats {
            has_data: snapshot.is_some(),
            size_bytes: raw.as_ref().map(String::len).unwrap_or(0),
            entry_count: snapshot.as_ref().map(|s| s.data.len()).unwrap_or(0),
            last_modified: snapshot.as_ref().map(|s| s.metadata.last_modified),
            sync_status: snapshot.as_ref().map(|s| s.metadata.sync_status).unwrap_or_default(),
            device_id: self.store.get(DEVICE_ID_KEY)?,
            last_sync_time: sync.last_sync_time,
            document_id: sync.document_id,
        })
    }

    /// Evicts snapshots older than [`CACHE_MAX_AGE_DAYS`] or unreadable.
    /// The live snapshot is kept while it holds changes the remote has not
    /// confirmed.
    ///
    /// Returns the number of keys removed.
    pub fn cleanup(&self) -> CacheResult<usize> {
        let cutoff = self.clock.now() - chrono::Duration::days(CACHE_MAX_AGE_DAYS);
        let mut evicted = 0;

        for key in self.store.keys()? {
            if !key.starts_with(CACHE_NAMESPACE) || PROTECTED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let stale = match self.store.get(&key)? {
                Some(raw) => match serde_json::from_str::<SnapshotHeader>(&raw) {
                    // The live snapshot is the only copy of unsynced edits.
                    Ok(header)
                        if key == CACHE_KEY && header.metadata.sync_status.is_unsynced() =>
                    {
                        false
                    }
                    Ok(header) => header.metadata.last_modified < cutoff,
                    Err(_) => true,
                },
                None => false,
            };
            if stale {
                self.store.delete(&key)?;
                tracing::debug!("evicted stale cache key {}", key);
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::info!("cache cleanup removed {} snapshot(s)", evicted);
        }
        Ok(evicted)
    }

    fn stored_metadata(&self) -> Option<CacheMetadata> {
        let raw = self.store.get(CACHE_KEY).ok()??;
        serde_json::from_str::<SnapshotHeader>(&raw).ok().map(|h| h.metadata)
    }
}

/// Checks the shape field by field before deserializing, so the warning
/// names what was wrong.
fn parse_snapshot(raw: &str) -> Result<Snapshot, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("not JSON: {e}"))?;

    for field in ["version", "lastModified", "deviceId"] {
        if !value["metadata"][field].is_string() {
            return Err(format!("metadata.{field} missing or not a string"));
        }
    }
    if !value["data"]["audiobooks"].is_array() {
        return Err("audiobooks missing or not an array".to_string());
    }

    serde_json::from_value(value).map_err(|e| e.to_string())
}
