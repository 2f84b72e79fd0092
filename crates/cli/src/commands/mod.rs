// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cache;
pub mod entry;
pub mod init;
pub mod queue;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use shelf_core::{ClockSource, FileStore, KeyValueStore, SystemClock};

use crate::config::{find_shelf_dir, store_dir, Config};
use crate::error::Result;
use crate::sync::{
    HttpTransport, LocalCache, OfflineQueue, RemoteStore, SyncManager, Transport,
};

/// An opened catalog directory: its config and durable store.
pub struct Workspace {
    pub shelf_dir: PathBuf,
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn ClockSource>,
}

impl Workspace {
    /// Opens the catalog found from the current context.
    pub fn open() -> Result<Self> {
        Self::open_at(&find_shelf_dir()?)
    }

    pub fn open_at(shelf_dir: &Path) -> Result<Self> {
        let config = Config::load(shelf_dir)?;
        let store = FileStore::open(&store_dir(shelf_dir))?;
        Ok(Workspace {
            shelf_dir: shelf_dir.to_path_buf(),
            config,
            store: Arc::new(store),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn cache(&self) -> LocalCache {
        LocalCache::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    pub fn queue(&self) -> Result<OfflineQueue> {
        Ok(OfflineQueue::open(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.config.queue_config(),
        )?)
    }

    /// Opens the sync manager against the configured document API.
    pub async fn manager(&self) -> Result<SyncManager> {
        let transport = HttpTransport::new(self.config.token())?;
        self.manager_with(transport).await
    }

    pub async fn manager_with<T: Transport>(&self, transport: T) -> Result<SyncManager<T>> {
        self.seed_document_id()?;
        let remote =
            RemoteStore::new(self.config.remote_config(), transport, &self.config.retry_policy());
        Ok(SyncManager::open(
            remote,
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.config.queue_config(),
        )
        .await?)
    }

    /// Points sync metadata at the configured document. Switching documents
    /// forgets the previous sync point, so the next sync pulls.
    fn seed_document_id(&self) -> Result<()> {
        let Some(id) = self.config.remote.document_id.as_deref() else {
            return Ok(());
        };
        let cache = self.cache();
        if cache.sync_metadata()?.document_id.as_deref() == Some(id) {
            return Ok(());
        }
        tracing::info!("using remote document {}", id);
        cache.update_sync_metadata(|m| {
            m.document_id = Some(id.to_string());
            m.last_sync_time = None;
            m.last_remote_updated = None;
        })?;
        Ok(())
    }

    /// Records the document id in the config file.
    pub fn remember_document_id(&mut self, id: &str) -> Result<()> {
        if self.config.remote.document_id.as_deref() == Some(id) {
            return Ok(());
        }
        self.config.remote.document_id = Some(id.to_string());
        self.config.save(&self.shelf_dir)
    }
}

/// Formats a timestamp for text output.
pub fn format_time(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}

/// Runs an async command body on a fresh runtime.
pub fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(future)
}
