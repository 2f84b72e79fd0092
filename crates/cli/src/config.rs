// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog configuration management.
//!
//! Configuration is stored in `.shelf/config.toml` next to the `store/`
//! directory holding the cache, sync metadata and offline queue:
//! - `[remote]`: document API location, document id and token variable
//! - `[retry]`: backoff timings for remote calls
//! - `[queue]`: offline queue bound and per-type retry ceilings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::sync::{QueueConfig, RemoteConfig, RetryCeilings, RetryPolicy};

const SHELF_DIR_NAME: &str = ".shelf";
const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_DIR_NAME: &str = "store";
const GITIGNORE_FILE_NAME: &str = ".gitignore";
const USER_DIR_NAME: &str = "shelf";

/// Catalog configuration stored in `.shelf/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub queue: QueueSection,
}

/// Remote document settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSection {
    /// Base URL of the document API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Path segment of the document collection (default: "gists").
    #[serde(default = "default_resource")]
    pub resource: String,
    /// Document holding the catalog. Created on first sync when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Environment variable holding the API token (default: "SHELF_TOKEN").
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Deadline for a single request attempt in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// File name the catalog is written to (default: "audiobooks.json").
    #[serde(default = "default_canonical_file")]
    pub canonical_file: String,
    /// Whether documents created on first sync are public (default: true).
    #[serde(default = "default_public")]
    pub public: bool,
}

impl Default for RemoteSection {
    fn default() -> Self {
        RemoteSection {
            api_url: default_api_url(),
            resource: default_resource(),
            document_id: None,
            token_env: default_token_env(),
            request_timeout_secs: default_request_timeout_secs(),
            canonical_file: default_canonical_file(),
            public: default_public(),
        }
    }
}

/// Backoff settings for remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySection {
    /// Total attempts per remote call; remote calls never exceed 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff step in milliseconds (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        RetrySection {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Offline queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSection {
    /// Maximum queued operations; the oldest is evicted beyond this (default: 100).
    #[serde(default = "default_max_queue_size")]
    pub max_size: usize,
    /// Attempts per operation type before it is dropped.
    #[serde(default)]
    pub ceilings: RetryCeilings,
}

impl Default for QueueSection {
    fn default() -> Self {
        QueueSection { max_size: default_max_queue_size(), ceilings: RetryCeilings::default() }
    }
}

fn default_api_url() -> String {
    crate::sync::DEFAULT_API_URL.to_string()
}

fn default_resource() -> String {
    crate::sync::DEFAULT_RESOURCE.to_string()
}

fn default_token_env() -> String {
    env::vars::SHELF_TOKEN.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_canonical_file() -> String {
    crate::sync::CANONICAL_FILE.to_string()
}

fn default_public() -> bool {
    true
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_queue_size() -> usize {
    crate::sync::DEFAULT_MAX_QUEUE_SIZE
}

impl Config {
    /// Loads configuration from the given `.shelf/` directory.
    pub fn load(shelf_dir: &Path) -> Result<Self> {
        let config_path = shelf_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the given `.shelf/` directory.
    pub fn save(&self, shelf_dir: &Path) -> Result<()> {
        let config_path = shelf_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Rejects values the sync layer cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = &self.remote.api_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "invalid api_url '{}': must start with http:// or https://",
                url
            )));
        }
        if self.remote.resource.trim().is_empty() {
            return Err(Error::Config("remote.resource cannot be empty".to_string()));
        }
        if !self.remote.canonical_file.ends_with(".json") {
            return Err(Error::Config(format!(
                "invalid canonical_file '{}': must end with .json",
                self.remote.canonical_file
            )));
        }
        if self.remote.document_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(Error::Config("remote.document_id cannot be empty".to_string()));
        }
        if self.queue.max_size == 0 {
            return Err(Error::Config("queue.max_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Settings for the remote store.
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            api_url: self.remote.api_url.clone(),
            resource: self.remote.resource.clone(),
            canonical_file: self.remote.canonical_file.clone(),
            public: self.remote.public,
            request_timeout: Duration::from_secs(self.remote.request_timeout_secs.max(1)),
            ..RemoteConfig::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_millis(self.retry.base_delay_ms);
        RetryPolicy::new(self.retry.max_retries.max(1), base_delay)
            .with_max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_size: self.queue.max_size,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            ceilings: self.queue.ceilings,
        }
    }

    /// The API token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        env::token(&self.remote.token_env)
    }
}

/// Find the `.shelf` directory.
///
/// `SHELF_DIR` wins when set. Otherwise walks up from the current directory,
/// then falls back to the per-user catalog if one was initialized.
pub fn find_shelf_dir() -> Result<PathBuf> {
    if let Some(dir) = env::shelf_dir() {
        return if dir.join(CONFIG_FILE_NAME).is_file() {
            Ok(dir)
        } else {
            Err(Error::NotInitialized)
        };
    }
    if let Some(dir) = find_shelf_dir_from(&std::env::current_dir()?) {
        return Ok(dir);
    }
    match user_shelf_dir() {
        Some(dir) if dir.join(CONFIG_FILE_NAME).is_file() => Ok(dir),
        _ => Err(Error::NotInitialized),
    }
}

/// Walks up from `start` looking for a `.shelf` directory.
pub fn find_shelf_dir_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let shelf_dir = current.join(SHELF_DIR_NAME);
        if shelf_dir.is_dir() {
            return Some(shelf_dir);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// The per-user catalog directory, e.g. `~/.local/share/shelf`.
pub fn user_shelf_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(USER_DIR_NAME))
}

/// Directory holding the key-value store files.
pub fn store_dir(shelf_dir: &Path) -> PathBuf {
    shelf_dir.join(STORE_DIR_NAME)
}

/// Initialize a new `.shelf` directory under `path`.
pub fn init_shelf_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    init_dir(path.join(SHELF_DIR_NAME), config)
}

/// Initialize `dir` itself as a catalog directory.
pub fn init_dir(dir: PathBuf, config: &Config) -> Result<PathBuf> {
    if dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(dir.display().to_string()));
    }
    config.validate()?;

    fs::create_dir_all(store_dir(&dir))?;
    config.save(&dir)?;
    write_gitignore(&dir)?;

    Ok(dir)
}

/// Write a .gitignore keeping device-local state out of version control.
pub fn write_gitignore(shelf_dir: &Path) -> Result<()> {
    let content = "# Device-local cache, sync metadata and offline queue\nstore/\n";
    fs::write(shelf_dir.join(GITIGNORE_FILE_NAME), content)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
