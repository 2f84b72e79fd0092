// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Test infrastructure for command testing against a mock remote.
//!
//! `TestContext` initializes a real `.shelf/` directory in a temp dir, pins
//! the clock and answers remote calls from an in-process mock document API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::commands::testing::TestContext;
//!
//! #[tokio::test]
//! async fn test_some_command() {
//!     let ctx = TestContext::new();
//!     let manager = ctx.manager().await;
//!     // Drive command logic through ctx.ws and manager
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use shelf_core::{ClockSource, ManualClock};
use tempfile::TempDir;

use super::Workspace;
use crate::config::{init_shelf_dir, Config};
use crate::sync::test_helpers::make_clock;
use crate::sync::transport_tests::{MockTransport, API_BASE};
use crate::sync::SyncManager;

/// Config pointing at the mock API with millisecond backoff.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.remote.api_url = API_BASE.to_string();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config
}

/// An initialized catalog with a pinned clock and mock remote.
pub struct TestContext {
    pub ws: Workspace,
    pub transport: MockTransport,
    pub clock: Arc<ManualClock>,
    pub shelf_dir: PathBuf,
    _temp_dir: TempDir, // Keep alive for duration of test
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let shelf_dir = init_shelf_dir(temp_dir.path(), &config).expect("Failed to init catalog");
        let clock = make_clock(100);
        let ws = Workspace { clock: clock.clone(), ..Workspace::open_at(&shelf_dir).unwrap() };
        TestContext { ws, transport: MockTransport::new(), clock, shelf_dir, _temp_dir: temp_dir }
    }

    pub async fn manager(&self) -> SyncManager<MockTransport> {
        self.ws.manager_with(self.transport.clone()).await.unwrap()
    }

    /// A second process opening the same directory.
    pub fn reopen(&self) -> Workspace {
        Workspace { clock: self.clock.clone(), ..Workspace::open_at(&self.shelf_dir).unwrap() }
    }
}

#[test]
fn test_open_at_requires_config() {
    let temp = TempDir::new().unwrap();
    assert!(Workspace::open_at(temp.path()).is_err());
}

#[tokio::test]
async fn test_configured_document_seeds_sync_metadata() {
    let mut config = test_config();
    config.remote.document_id = Some("doc-7".to_string());
    let ctx = TestContext::with_config(config);

    ctx.manager().await;

    let meta = ctx.ws.cache().sync_metadata().unwrap();
    assert_eq!(meta.document_id.as_deref(), Some("doc-7"));
    assert_eq!(meta.last_sync_time, None);
}

#[tokio::test]
async fn test_switching_document_forgets_sync_point() {
    let mut ctx = TestContext::new();
    let now = ctx.clock.now();
    ctx.ws
        .cache()
        .update_sync_metadata(|m| {
            m.document_id = Some("doc-1".to_string());
            m.last_sync_time = Some(now);
        })
        .unwrap();
    ctx.ws.config.remote.document_id = Some("doc-2".to_string());

    ctx.manager().await;

    let meta = ctx.ws.cache().sync_metadata().unwrap();
    assert_eq!(meta.document_id.as_deref(), Some("doc-2"));
    assert_eq!(meta.last_sync_time, None);
}

#[test]
fn test_remember_document_id_persists() {
    let mut ctx = TestContext::new();
    ctx.ws.remember_document_id("doc-3").unwrap();

    let reloaded = Config::load(&ctx.shelf_dir).unwrap();
    assert_eq!(reloaded.remote.document_id.as_deref(), Some("doc-3"));
}

#[test]
fn test_format_time() {
    assert_eq!(super::format_time(None), "never");
    let at = crate::sync::test_helpers::ts(0);
    assert_eq!(super::format_time(Some(at)), "2026-01-01 00:00:00 UTC");
}

#[test]
fn test_block_on_propagates_errors() {
    let result = super::block_on(async { Err(crate::error::Error::NotInitialized) });
    assert!(matches!(result, Err(crate::error::Error::NotInitialized)));
}
