// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first catalog sync.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ SyncManager │────►│ RemoteStore │────►│  Transport  │────►│   Remote    │
//! │             │◄────│ (+ retries) │◄────│   (trait)   │◄────│  document   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!    │       │
//!    ▼       ▼
//! ┌───────┐ ┌──────────────┐
//! │ Local │ │ OfflineQueue │  (pending mutations)
//! │ Cache │ └──────────────┘
//! └───────┘
//! ```
//!
//! # Features
//!
//! - Write-through local cache with a per-installation device id
//! - Bounded, coalescing offline queue with per-type retry ceilings
//! - Exponential backoff with jitter for transient remote failures
//! - Conflict detection against the last confirmed sync
//! - Injectable transport trait for testing

mod cache;
mod manager;
mod queue;
mod remote;
mod retry;
mod transport;

pub use cache::{
    CacheError, CacheMetadata, CacheStats, CachedData, LocalCache, SaveOptions, SyncMetadata,
    SyncStatus,
};
pub use manager::{
    ConflictHandler, StatusListener, SyncDirection, SyncError, SyncManager, SyncOutcome,
    SyncPhase, SyncReport,
};
pub use queue::{
    OfflineQueue, OperationFailure, ProcessReport, QueueConfig, QueueError, QueueStats,
    RetryCeilings, DEFAULT_MAX_QUEUE_SIZE, QUEUE_KEY,
};
pub use remote::{
    DocumentMetadata, RemoteConfig, RemoteStore, Visibility, CANONICAL_FILE, DEFAULT_API_URL,
    DEFAULT_RESOURCE,
};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport, TransportError};

#[cfg(test)]
pub(crate) mod test_helpers;




#[cfg(test)]
mod remote_tests;


#[cfg(test)]
pub(crate) mod transport_tests;
