// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! shelfrs - An offline-first audiobook catalog with multi-device sync.
//!
//! This crate provides the `shelf` CLI: a local catalog that keeps working
//! offline and reconciles with a remote JSON document when it can.
//!
//! # Main Components
//!
//! - [`sync::SyncManager`] - Orchestrates the cache, offline queue and remote
//! - [`sync::LocalCache`] - Durable snapshot of the catalog on this device
//! - [`sync::OfflineQueue`] - Mutations waiting to reach the remote document
//! - [`sync::RemoteStore`] - Document API client with retries
//! - [`Config`] - Catalog configuration (remote, retry and queue settings)
//! - [`Error`] - Error types for all operations
//!
//! # Initialization
//!
//! Use [`init_shelf_dir`] to create a new `.shelf/` directory, then open the
//! sync manager over its store:
//!
//! ```rust,ignore
//! use shelfrs::{init_shelf_dir, Config};
//!
//! let shelf_dir = init_shelf_dir(Path::new("."), &Config::default())?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod env;
pub mod error;
pub mod id;
pub mod sync;

pub use cli::{CacheCommand, Cli, Command, ConflictChoice, EntryArgs, OutputArgs, OutputFormat};
pub use config::{find_shelf_dir, init_shelf_dir, Config};
pub use error::{Error, Result};

/// Execute a parsed command.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Add { title, entry } => commands::entry::add(title, entry),
        Command::Edit { id, field, value } => commands::entry::edit(&id, &field, &value),
        Command::Remove { id } => commands::entry::remove(&id),
        Command::List { output } => commands::entry::list(output.output),
        Command::Show { id, output } => commands::entry::show(&id, output.output),
        Command::Genre { name } => commands::entry::genre(&name),
        Command::Mood { name } => commands::entry::mood(&name),
        Command::Sync { on_conflict } => commands::sync::run(on_conflict),
        Command::Status { output } => commands::status::run(output.output),
        Command::Queue { output } => commands::queue::run(output.output),
        Command::Cache { command } => match command {
            CacheCommand::Stats { output } => commands::cache::stats(output.output),
            CacheCommand::Cleanup => commands::cache::cleanup(),
            CacheCommand::Clear { queue } => commands::cache::clear(queue),
        },
        Command::Init {
            path,
            user,
            document,
            api_url,
        } => commands::init::run(path, user, document, api_url),
    }
}
