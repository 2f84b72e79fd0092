// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! shelf-core: data model and pure sync primitives for the shelf catalog.
//!
//! This crate holds everything in the sync subsystem that does not talk to
//! the network: the collection model, queued operations, failure
//! classification, conflict detection and resolution, and the key-value
//! storage capability used by the cache and the offline queue.

pub mod classify;
pub mod clock;
pub mod collection;
pub mod conflict;
pub mod error;
pub mod op;
pub mod store;

pub use classify::{classify, Classification, ClassifiedError, ErrorCategory, Failure};
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use collection::{Collection, Entry, COLLECTION_VERSION};
pub use conflict::{ConflictInfo, Replica, Resolution};
pub use error::{Error, Result};
pub use op::{OpKind, QueueOperation, SYNC_OP_ID};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreResult};
