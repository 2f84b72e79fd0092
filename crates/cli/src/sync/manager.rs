// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync orchestration.
//!
//! [`SyncManager`] owns the in-memory collection, the local cache and the
//! offline queue, and reconciles them with the remote document.
//!
//! ```text
//!   mutation ──► collection ──► LocalCache ──► OfflineQueue
//!                                                  │
//!   sync():  drain queue ──► fetch remote ──► compare ──► conflict?
//!                                                  │          │
//!                               adopt / push ◄─────┴──────────┘
//! ```
//!
//! Phases move `idle → syncing → {conflict, error} → idle`. Only one sync
//! runs at a time; a second call while one is in flight returns
//! [`SyncOutcome::AlreadyInFlight`] immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelf_core::conflict::{detect, resolve};
use shelf_core::{
    ClassifiedError, ClockSource, Collection, ConflictInfo, Entry, ErrorCategory, KeyValueStore,
    QueueOperation, Replica, Resolution,
};
use tokio::sync::{Mutex, MutexGuard};

use super::cache::{CacheError, CacheMetadata, LocalCache, SaveOptions, SyncStatus};
use super::queue::{
    OfflineQueue, ProcessReport, QueueConfig, QueueError, QueueProcessor, QueueStats,
};
use super::remote::RemoteStore;
use super::transport::{HttpTransport, Transport};

/// Device id reported for remote collections that carry none.
const UNKNOWN_DEVICE: &str = "unknown";

/// Error type for sync manager operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] ClassifiedError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Invalid(#[from] shelf_core::Error),

    #[error("conflict with device {} was not resolved", .0.remote_device_id)]
    ConflictUnresolved(ConflictInfo),
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::Remote(e) => e.category,
            SyncError::Cache(e) => e.category(),
            SyncError::Queue(e) => e.category(),
            SyncError::Invalid(e) => e.category(),
            SyncError::ConflictUnresolved(_) => ErrorCategory::Conflict,
        }
    }

    /// Suggested next steps for the user.
    pub fn recovery_actions(&self) -> Vec<String> {
        match self {
            SyncError::Remote(e) => e.recovery_actions.clone(),
            SyncError::ConflictUnresolved(_) => vec![
                "Run 'shelf sync --on-conflict keep-local' to keep this device's version".to_string(),
                "Run 'shelf sync --on-conflict keep-remote' to take the other device's version"
                    .to_string(),
                "Run 'shelf sync --on-conflict merge' to combine both".to_string(),
            ],
            other => other.category().recovery_actions().iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result type for sync manager operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Where the sync state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Syncing,
    Conflict,
    Error,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Syncing => "syncing",
            SyncPhase::Conflict => "conflict",
            SyncPhase::Error => "error",
        }
    }
}

/// Receives every phase change.
pub trait StatusListener: Send + Sync {
    fn on_status_change(&self, phase: SyncPhase);
}

/// Chooses how a conflict is resolved.
///
/// Returning `None` abandons the sync; nothing is written and the conflict is
/// raised again on the next sync.
pub trait ConflictHandler: Send + Sync {
    fn resolve<'a>(
        &'a self,
        info: &'a ConflictInfo,
        local: &'a Collection,
        remote: &'a Collection,
    ) -> Pin<Box<dyn Future<Output = Option<Resolution>> + Send + 'a>>;
}

/// A fixed choice, for non-interactive callers.
impl ConflictHandler for Resolution {
    fn resolve<'a>(
        &'a self,
        _info: &'a ConflictInfo,
        _local: &'a Collection,
        _remote: &'a Collection,
    ) -> Pin<Box<dyn Future<Output = Option<Resolution>> + Send + 'a>> {
        Box::pin(std::future::ready(Some(*self)))
    }
}

/// Which side ended up authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// No document existed; one was created from the local collection.
    Created,
    /// The remote collection replaced the local one.
    Pulled,
    /// The local collection replaced the remote one.
    Pushed,
    /// Both sides already held the same catalog.
    UpToDate,
    /// A conflict was resolved with the given choice.
    Resolved(Resolution),
}

/// Summary of a completed sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub document_id: String,
    pub direction: SyncDirection,
    pub queue: ProcessReport,
    pub entries: usize,
    /// Operations still queued after this sync.
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another sync was running; this call did nothing.
    AlreadyInFlight,
}

/// Clears the in-flight flag on every exit path.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State guarded by the manager's lock.
struct Core {
    collection: Collection,
    cache: LocalCache,
    queue: OfflineQueue,
    /// Metadata of the last snapshot written or loaded.
    saved: Option<CacheMetadata>,
}

impl Core {
    fn local_modified(&self) -> DateTime<Utc> {
        self.saved.as_ref().map(|m| m.last_modified).unwrap_or(self.collection.last_updated)
    }

    fn save(&mut self, collection: &Collection, options: SaveOptions) -> SyncResult<()> {
        self.saved = Some(self.cache.save_data(collection, options)?);
        Ok(())
    }

    /// Write-through: cache, then queue, then memory. A failed enqueue puts
    /// the previous snapshot back.
    fn apply(&mut self, next: Collection, op: QueueOperation) -> SyncResult<()> {
        let previous = self.saved.clone();
        self.save(&next, SaveOptions::with_status(SyncStatus::Pending))?;

        if let Err(e) = self.queue.enqueue(op) {
            let restored = match &previous {
                Some(meta) => self
                    .cache
                    .save_data(
                        &self.collection,
                        SaveOptions {
                            update_timestamp: false,
                            sync_status: Some(meta.sync_status),
                        },
                    )
                    .map(|_| ()),
                None => self.cache.discard_snapshot(),
            };
            if let Err(restore_err) = restored {
                tracing::warn!("could not restore cache after queue failure: {}", restore_err);
            }
            self.saved = previous;
            return Err(e.into());
        }

        self.collection = next;
        Ok(())
    }

    /// Makes `collection` the local state without stamping a new
    /// modification time.
    fn adopt(&mut self, collection: Collection) -> SyncResult<()> {
        let status = if self.queue.is_empty() { SyncStatus::Synced } else { SyncStatus::Pending };
        self.save(&collection, SaveOptions { update_timestamp: false, sync_status: Some(status) })?;
        self.collection = collection;
        Ok(())
    }
}

/// Replays queued operations against a working copy of the remote document.
struct RemoteProcessor<'a, T: Transport> {
    remote: &'a RemoteStore<T>,
    clock: &'a dyn ClockSource,
    document_id: &'a str,
    device_id: &'a str,
    /// Remote state after the last successful push. Reset on failure so the
    /// next operation starts from a fresh read.
    working: Option<Collection>,
    /// Author and timestamp of the remote as first read, before any push.
    baseline: Option<(Option<String>, DateTime<Utc>)>,
}

impl<T: Transport> RemoteProcessor<'_, T> {
    async fn apply(&mut self, op: &QueueOperation) -> Result<(), ClassifiedError> {
        let mut next = match self.working.take() {
            Some(collection) => collection,
            None => {
                let fresh = self.remote.read(self.document_id).await?;
                self.baseline.get_or_insert_with(|| (fresh.updated_by.clone(), fresh.last_updated));
                fresh
            }
        };

        let changed = op
            .apply_to(&mut next)
            .map_err(|e| ClassifiedError::validation(format!("{} {}: {}", op.kind, op.id, e)))?;
        if changed {
            next.touch(self.clock.now());
            next.updated_by = Some(self.device_id.to_string());
            self.remote.update(self.document_id, &next).await?;
        }

        self.working = Some(next);
        Ok(())
    }
}

impl<T: Transport> QueueProcessor for RemoteProcessor<'_, T> {
    fn process<'a>(
        &'a mut self,
        op: &'a QueueOperation,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClassifiedError>> + Send + 'a>> {
        Box::pin(async move {
            let result = self.apply(op).await;
            if result.is_err() {
                self.working = None;
            }
            result
        })
    }
}

/// Re-applies still-pending operations onto a remote collection so local
/// edits that have not reached the remote survive adopting it.
fn rebase(remote: &Collection, pending: &[QueueOperation]) -> Collection {
    let mut rebased = remote.clone();
    for op in pending {
        if let Err(e) = op.apply_to(&mut rebased) {
            tracing::warn!("could not replay {} {} onto remote: {}", op.kind, op.id, e);
        }
    }
    rebased
}

enum Plan {
    UpToDate,
    Pull(Collection),
    Push(Collection),
    Resolved(Resolution, Collection),
}

/// Offline-first catalog with remote sync.
pub struct SyncManager<T: Transport = HttpTransport> {
    remote: RemoteStore<T>,
    clock: Arc<dyn ClockSource>,
    core: Mutex<Core>,
    in_flight: AtomicBool,
    phase: std::sync::Mutex<SyncPhase>,
    conflict_handler: Option<Arc<dyn ConflictHandler>>,
    listener: Option<Arc<dyn StatusListener>>,
}

impl<T: Transport> SyncManager<T> {
    /// Opens the catalog: the cached snapshot if there is one, else the
    /// remote document if one is configured, else an empty catalog.
    pub async fn open(
        remote: RemoteStore<T>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn ClockSource>,
        queue_config: QueueConfig,
    ) -> SyncResult<Self> {
        let cache = LocalCache::new(Arc::clone(&store), Arc::clone(&clock));
        let queue = OfflineQueue::open(store, Arc::clone(&clock), queue_config)?;
        let collection = Collection::empty(clock.now());
        let mut core = Core { collection, cache, queue, saved: None };

        if let Some(cached) = core.cache.load_data()? {
            tracing::debug!("loaded {} cached entries", cached.collection.len());
            core.collection = cached.collection;
            core.saved = Some(cached.metadata);
        } else {
            let mut loaded = false;
            if let Some(id) = core.cache.sync_metadata()?.document_id {
                match remote.read(&id).await {
                    Ok(collection) => {
                        tracing::info!("loaded {} entries from remote {}", collection.len(), id);
                        let remote_updated = collection.last_updated;
                        let pending = core.queue.operations().to_vec();
                        core.adopt(rebase(&collection, &pending))?;
                        let now = clock.now();
                        core.cache.update_sync_metadata(|m| {
                            m.last_sync_time = Some(now);
                            m.last_remote_updated = Some(remote_updated);
                        })?;
                        loaded = true;
                    }
                    Err(e) => tracing::warn!("remote load failed: {}", e),
                }
            }
            if !loaded && !core.queue.is_empty() {
                tracing::info!("rebuilding catalog from {} queued operations", core.queue.len());
                let pending = core.queue.operations().to_vec();
                let replayed = rebase(&core.collection, &pending);
                core.adopt(replayed)?;
            }
        }

        Ok(SyncManager {
            remote,
            clock,
            core: Mutex::new(core),
            in_flight: AtomicBool::new(false),
            phase: std::sync::Mutex::new(SyncPhase::Idle),
            conflict_handler: None,
            listener: None,
        })
    }

    pub fn with_conflict_handler(mut self, handler: Arc<dyn ConflictHandler>) -> Self {
        self.conflict_handler = Some(handler);
        self
    }

    pub fn with_status_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: SyncPhase) {
        {
            let mut current = self.phase.lock().unwrap_or_else(|e| e.into_inner());
            if *current == phase {
                return;
            }
            *current = phase;
        }
        tracing::debug!("sync phase -> {}", phase.as_str());
        if let Some(listener) = &self.listener {
            listener.on_status_change(phase);
        }
    }

    /// A copy of the current collection.
    pub async fn collection(&self) -> Collection {
        self.core.lock().await.collection.clone()
    }

    pub async fn pending_operations(&self) -> Vec<QueueOperation> {
        self.core.lock().await.queue.operations().to_vec()
    }

    pub async fn queue_stats(&self) -> QueueStats {
        self.core.lock().await.queue.stats()
    }

    pub async fn device_id(&self) -> SyncResult<String> {
        Ok(self.core.lock().await.cache.device_id()?)
    }

    /// Adds a new entry. Fails if the id is taken.
    pub async fn add_audiobook(&self, entry: Entry) -> SyncResult<Entry> {
        let mut core = self.core.lock().await;
        let now = self.clock.now();
        let id = entry.id.clone();

        let mut next = core.collection.clone();
        next.insert(entry, now)?;
        let stored = stored_entry(&next, &id)?;
        core.apply(next, QueueOperation::add(&stored, now)?)?;

        tracing::debug!("added audiobook {}", id);
        Ok(stored)
    }

    /// Replaces an existing entry, keeping its `addedAt`.
    pub async fn update_audiobook(&self, entry: Entry) -> SyncResult<Entry> {
        let mut core = self.core.lock().await;
        let now = self.clock.now();
        let id = entry.id.clone();

        let mut next = core.collection.clone();
        next.replace(entry, now)?;
        let stored = stored_entry(&next, &id)?;
        core.apply(next, QueueOperation::update(&stored, now)?)?;

        tracing::debug!("updated audiobook {}", id);
        Ok(stored)
    }

    /// Removes an entry, returning it.
    pub async fn remove_audiobook(&self, id: &str) -> SyncResult<Entry> {
        let mut core = self.core.lock().await;
        let now = self.clock.now();

        let mut next = core.collection.clone();
        let removed = next.remove(id, now)?;
        core.apply(next, QueueOperation::delete(id, now))?;

        tracing::debug!("removed audiobook {}", id);
        Ok(removed)
    }

    /// Adds a custom genre. Returns false when it already existed.
    pub async fn add_custom_genre(&self, name: &str) -> SyncResult<bool> {
        self.add_tag(name, Collection::add_custom_genre).await
    }

    /// Adds a custom mood. Returns false when it already existed.
    pub async fn add_custom_mood(&self, name: &str) -> SyncResult<bool> {
        self.add_tag(name, Collection::add_custom_mood).await
    }

    async fn add_tag(
        &self,
        name: &str,
        add: fn(&mut Collection, &str, DateTime<Utc>) -> bool,
    ) -> SyncResult<bool> {
        if name.trim().is_empty() {
            return Err(shelf_core::Error::InvalidInput("name cannot be empty".to_string()).into());
        }
        let mut core = self.core.lock().await;
        let now = self.clock.now();

        let mut next = core.collection.clone();
        if !add(&mut next, name, now) {
            return Ok(false);
        }
        let op = QueueOperation::sync(&next, now);
        core.apply(next, op)?;
        Ok(true)
    }

    /// Reconciles the local catalog with the remote document.
    pub async fn sync(&self) -> SyncResult<SyncOutcome> {
        let Some(_flight) = FlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("sync already in flight");
            return Ok(SyncOutcome::AlreadyInFlight);
        };

        self.set_phase(SyncPhase::Syncing);
        match self.run_sync().await {
            Ok(report) => {
                tracing::info!(
                    "sync complete: {:?}, {} entries, {} pending",
                    report.direction,
                    report.entries,
                    report.pending
                );
                self.set_phase(SyncPhase::Idle);
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                tracing::warn!("sync failed: {}", e);
                self.record_failure(&e).await;
                self.set_phase(SyncPhase::Error);
                Err(e)
            }
        }
    }

    /// Bookkeeping after a failed sync. The snapshot itself is not touched.
    async fn record_failure(&self, error: &SyncError) {
        let core = self.core.lock().await;
        let status = match error {
            SyncError::ConflictUnresolved(_) => SyncStatus::Pending,
            _ => SyncStatus::Error,
        };
        if let Err(e) = core.cache.set_sync_status(status) {
            tracing::warn!("could not record sync status: {}", e);
        }
        let message = error.to_string();
        if let Err(e) = core.cache.update_sync_metadata(|m| m.last_error = Some(message)) {
            tracing::warn!("could not record sync error: {}", e);
        }
    }

    async fn run_sync(&self) -> SyncResult<SyncReport> {
        let mut core = self.core.lock().await;
        let device_id = core.cache.device_id()?;
        let meta = core.cache.sync_metadata()?;

        let Some(document_id) = meta.document_id else {
            return self.create_document(core, &device_id).await;
        };

        // 1. drain
        let mut processor = RemoteProcessor {
            remote: &self.remote,
            clock: self.clock.as_ref(),
            document_id: &document_id,
            device_id: &device_id,
            working: None,
            baseline: None,
        };
        let queue_report = core.queue.process_queue(&mut processor).await?;
        for dropped in queue_report.dropped() {
            tracing::warn!("dropped queued {} {}: {}", dropped.kind, dropped.id, dropped.message);
        }

        // 2. fetch
        let remote = match processor.working.take() {
            Some(collection) => collection,
            None => self.remote.read(&document_id).await?,
        };

        // 3. compare, judging remote freshness by its state before our pushes
        let (remote_author, remote_modified) = processor
            .baseline
            .take()
            .unwrap_or_else(|| (remote.updated_by.clone(), remote.last_updated));
        let remote_device = remote_author.unwrap_or_else(|| UNKNOWN_DEVICE.to_string());
        let pending = core.queue.operations().to_vec();
        let rebased = rebase(&remote, &pending);
        let local = core.collection.clone();
        let local_modified = core.local_modified();
        let conflict = detect(
            &Replica { device_id: &device_id, modified: local_modified, collection: &local },
            &Replica { device_id: &remote_device, modified: remote_modified, collection: &rebased },
            meta.last_sync_time,
        );

        // 4. decide
        let plan = match conflict {
            Some(info) => {
                core.cache.set_sync_status(SyncStatus::Conflict)?;
                drop(core);
                let resolution = self.await_resolution(&info, &local, &rebased).await?;
                core = self.core.lock().await;
                // Mutations made while the handler was waiting go on top of
                // whichever side won.
                let later: Vec<QueueOperation> = core
                    .queue
                    .operations()
                    .iter()
                    .filter(|op| !pending.contains(op))
                    .cloned()
                    .collect();
                let current = core.collection.clone();
                let resolved = resolve(resolution, &current, &rebased, self.clock.now());
                Plan::Resolved(resolution, rebase(&resolved, &later))
            }
            None if meta.last_sync_time.is_none() => Plan::Pull(rebased),
            None if local.same_content(&rebased) => Plan::UpToDate,
            None if local_modified > remote.last_updated => Plan::Push(local),
            None => Plan::Pull(rebased),
        };

        // 5. persist
        let mut remote_updated = remote.last_updated;
        let direction = match plan {
            Plan::UpToDate => {
                let status =
                    if core.queue.is_empty() { SyncStatus::Synced } else { SyncStatus::Pending };
                core.cache.set_sync_status(status)?;
                SyncDirection::UpToDate
            }
            Plan::Pull(collection) => {
                core.adopt(collection)?;
                SyncDirection::Pulled
            }
            Plan::Push(collection) => {
                let pushed = self.push(&document_id, collection, &device_id).await?;
                remote_updated = pushed.last_updated;
                core.queue.clear()?;
                core.adopt(pushed)?;
                SyncDirection::Pushed
            }
            Plan::Resolved(resolution, collection) => {
                let adopted = if collection.same_content(&remote) {
                    collection
                } else {
                    let pushed = self.push(&document_id, collection, &device_id).await?;
                    remote_updated = pushed.last_updated;
                    pushed
                };
                core.queue.clear()?;
                core.adopt(adopted)?;
                tracing::info!("conflict resolved with {}", resolution);
                SyncDirection::Resolved(resolution)
            }
        };

        // 6. record
        let now = self.clock.now();
        core.cache.update_sync_metadata(|m| {
            m.last_sync_time = Some(now);
            m.document_id = Some(document_id.clone());
            m.last_remote_updated = Some(remote_updated);
            m.last_error = None;
        })?;

        Ok(SyncReport {
            document_id,
            direction,
            queue: queue_report,
            entries: core.collection.len(),
            pending: core.queue.len(),
        })
    }

    /// First sync without a document: publish the local catalog.
    async fn create_document(
        &self,
        mut core: MutexGuard<'_, Core>,
        device_id: &str,
    ) -> SyncResult<SyncReport> {
        let mut initial = core.collection.clone();
        initial.updated_by = Some(device_id.to_string());

        let document_id = self.remote.create(&initial, None).await?;
        core.queue.clear()?;
        core.adopt(initial)?;

        let now = self.clock.now();
        let remote_updated = core.collection.last_updated;
        let id = document_id.clone();
        core.cache.update_sync_metadata(|m| {
            m.last_sync_time = Some(now);
            m.document_id = Some(id);
            m.last_remote_updated = Some(remote_updated);
            m.last_error = None;
        })?;

        Ok(SyncReport {
            document_id,
            direction: SyncDirection::Created,
            queue: ProcessReport::default(),
            entries: core.collection.len(),
            pending: 0,
        })
    }

    async fn push(
        &self,
        document_id: &str,
        mut collection: Collection,
        device_id: &str,
    ) -> SyncResult<Collection> {
        collection.updated_by = Some(device_id.to_string());
        self.remote.update(document_id, &collection).await?;
        Ok(collection)
    }

    /// Hands the conflict to the handler with the core lock released.
    async fn await_resolution(
        &self,
        info: &ConflictInfo,
        local: &Collection,
        remote: &Collection,
    ) -> SyncResult<Resolution> {
        self.set_phase(SyncPhase::Conflict);
        tracing::info!(
            "conflict: local {} at {}, remote {} at {}",
            info.local_device_id,
            info.local_timestamp,
            info.remote_device_id,
            info.remote_timestamp
        );

        let choice = match &self.conflict_handler {
            Some(handler) => handler.resolve(info, local, remote).await,
            None => None,
        };
        match choice {
            Some(resolution) => {
                self.set_phase(SyncPhase::Syncing);
                Ok(resolution)
            }
            None => Err(SyncError::ConflictUnresolved(info.clone())),
        }
    }
}

fn stored_entry(collection: &Collection, id: &str) -> SyncResult<Entry> {
    collection
        .get(id)
        .cloned()
        .ok_or_else(|| shelf_core::Error::EntryNotFound(id.to_string()).into())
}
