// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The `init` command.

use std::path::{Path, PathBuf};

use crate::config::{init_dir, init_shelf_dir, user_shelf_dir, Config};
use crate::error::{Error, Result};

pub fn run(
    path: Option<String>,
    user: bool,
    document: Option<String>,
    api_url: Option<String>,
) -> Result<()> {
    let config = build_config(document, api_url);
    let shelf_dir = if user {
        let dir = user_shelf_dir()
            .ok_or_else(|| Error::Config("no per-user data directory on this system".to_string()))?;
        init_dir(dir, &config)?
    } else {
        let target = match path {
            Some(p) => PathBuf::from(p),
            None => std::env::current_dir()?,
        };
        init_at(&target, &config)?
    };

    println!("Initialized catalog at {}", shelf_dir.display());
    match &config.remote.document_id {
        Some(id) => println!("Remote document: {}", id),
        None => println!("A remote document will be created on first 'shelf sync'"),
    }
    Ok(())
}

pub fn build_config(document: Option<String>, api_url: Option<String>) -> Config {
    let mut config = Config::default();
    config.remote.document_id = document.map(|d| d.trim().to_string());
    if let Some(url) = api_url {
        config.remote.api_url = url.trim_end_matches('/').to_string();
    }
    config
}

/// Initializes `<target>/.shelf`, creating `target` if needed.
pub fn init_at(target: &Path, config: &Config) -> Result<PathBuf> {
    std::fs::create_dir_all(target)?;
    init_shelf_dir(target, config)
}
