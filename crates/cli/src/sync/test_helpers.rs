// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use shelf_core::{Collection, Entry, KeyValueStore, ManualClock, MemoryStore};

use super::cache::LocalCache;
use super::queue::{OfflineQueue, QueueConfig};
use super::remote::{RemoteConfig, RemoteStore};
use super::retry::RetryPolicy;
use super::transport_tests::{MockTransport, API_BASE};

/// A fixed instant `secs` seconds after 2026-01-01T00:00:00Z.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600 + secs, 0).unwrap()
}

/// A retry policy with millisecond backoff.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(1)).with_max_delay(Duration::from_millis(5))
}

pub fn remote_config() -> RemoteConfig {
    RemoteConfig {
        api_url: API_BASE.to_string(),
        request_timeout: Duration::from_secs(5),
        ..RemoteConfig::default()
    }
}

pub fn make_remote(transport: &MockTransport) -> RemoteStore<MockTransport> {
    RemoteStore::new(remote_config(), transport.clone(), &fast_retry())
}

pub fn make_entry(id: &str, title: &str) -> Entry {
    let mut entry = Entry::new(id, title);
    entry.author = format!("Author of {title}");
    entry.rating = 4;
    entry.price = 9.99;
    entry.genres = vec!["fantasy".to_string()];
    entry
}

/// A collection holding one entry per id, last updated at `ts(updated)`.
pub fn make_collection(ids: &[&str], updated: i64) -> Collection {
    let mut collection = Collection::empty(ts(0));
    for id in ids {
        collection.insert(make_entry(id, &format!("Book {id}")), ts(0)).unwrap();
    }
    collection.last_updated = ts(updated);
    collection
}

pub fn make_clock(secs: i64) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(ts(secs)))
}

pub fn make_cache(store: &Arc<MemoryStore>, clock: &Arc<ManualClock>) -> LocalCache {
    let store: Arc<dyn KeyValueStore> = store.clone();
    LocalCache::new(store, clock.clone())
}

/// A queue whose failed operations are retryable again immediately.
pub fn make_queue(store: &Arc<MemoryStore>, clock: &Arc<ManualClock>) -> OfflineQueue {
    let config = QueueConfig { base_delay: Duration::ZERO, ..QueueConfig::default() };
    make_queue_with(store, clock, config)
}

pub fn make_queue_with(
    store: &Arc<MemoryStore>,
    clock: &Arc<ManualClock>,
    config: QueueConfig,
) -> OfflineQueue {
    let store: Arc<dyn KeyValueStore> = store.clone();
    OfflineQueue::open(store, clock.clone(), config).unwrap()
}
