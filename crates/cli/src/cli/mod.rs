// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand, ValueEnum};
use shelf_core::Resolution;

pub use args::{EntryArgs, OutputArgs};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How `shelf sync` answers a conflict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ConflictChoice {
    /// Prompt on the terminal
    #[default]
    Ask,
    /// Keep this device's catalog
    KeepLocal,
    /// Take the remote catalog
    KeepRemote,
    /// Union both catalogs by id
    Merge,
}

impl ConflictChoice {
    /// The fixed resolution, or `None` when the user is asked.
    pub fn resolution(self) -> Option<Resolution> {
        match self {
            ConflictChoice::Ask => None,
            ConflictChoice::KeepLocal => Some(Resolution::KeepLocal),
            ConflictChoice::KeepRemote => Some(Resolution::KeepRemote),
            ConflictChoice::Merge => Some(Resolution::Merge),
        }
    }
}

// Custom help template that groups commands into sections
const HELP_TEMPLATE: &str = "{about-with-newline}
{usage-heading} {usage}

{before-help}Options:
{options}{after-help}";

const COMMANDS_HELP: &str = "\
Catalog:
  add         Add an audiobook
  edit        Edit an audiobook field
  remove      Remove an audiobook
  list        List audiobooks
  show        Show an audiobook
  genre       Add a custom genre
  mood        Add a custom mood

Sync:
  sync        Sync with the remote document
  status      Show sync status
  queue       Show pending offline operations
  cache       Inspect or clean the local cache

Setup:
  init        Initialize a catalog";

const QUICKSTART_HELP: &str = "\
Get started:
  shelf init                              Initialize a catalog
  shelf add \"Dune\" -a \"Frank Herbert\"     Add an audiobook
  shelf list                              List the catalog
  shelf sync                              Push to the remote document";

#[derive(Parser)]
#[command(name = "shelf", version)]
#[command(about = "An offline-first audiobook catalog with multi-device sync")]
#[command(help_template = HELP_TEMPLATE)]
#[command(before_help = COMMANDS_HELP)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Log sync activity to stderr (repeat for more detail)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────
    /// Add an audiobook
    #[command(after_help = "Examples:\n  \
        shelf add \"Dune\" -a \"Frank Herbert\"                 Title and author\n  \
        shelf add \"Emma\" -a Austen -g classic -g romance     With genres\n  \
        shelf add \"Dune\" -a Herbert --rating 5 --price 12.5  With rating and price")]
    Add {
        /// Title of the audiobook
        #[arg(value_parser = non_empty_string)]
        title: String,

        #[command(flatten)]
        entry: EntryArgs,
    },

    /// Edit an audiobook field
    #[command(
        arg_required_else_help = true,
        after_help = "Fields: title, author, narrator, url, image, length, releaseDate, rating, price\n\n\
        Examples:\n  \
        shelf edit ab-1a2b3c4d rating 5\n  \
        shelf edit ab-1a2b3c4d narrator \"Scott Brick\""
    )]
    Edit {
        /// Audiobook ID
        id: String,

        /// Field to change
        field: String,

        /// New value
        value: String,
    },

    /// Remove an audiobook
    #[command(arg_required_else_help = true)]
    Remove {
        /// Audiobook ID
        id: String,
    },

    /// List audiobooks
    List {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show an audiobook
    #[command(arg_required_else_help = true)]
    Show {
        /// Audiobook ID
        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Add a custom genre
    #[command(arg_required_else_help = true)]
    Genre {
        /// Genre name
        #[arg(value_parser = non_empty_string)]
        name: String,
    },

    /// Add a custom mood
    #[command(arg_required_else_help = true)]
    Mood {
        /// Mood name
        #[arg(value_parser = non_empty_string)]
        name: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────
    /// Sync with the remote document
    #[command(after_help = "Examples:\n  \
        shelf sync                              Prompt if a conflict is found\n  \
        shelf sync --on-conflict merge          Merge both sides without asking")]
    Sync {
        /// How to resolve a conflict
        #[arg(long, value_enum, default_value = "ask")]
        on_conflict: ConflictChoice,
    },

    /// Show sync status
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show pending offline operations
    Queue {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect or clean the local cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────
    /// Initialize a catalog
    #[command(after_help = "Examples:\n  \
        shelf init                               Catalog in ./.shelf\n  \
        shelf init --document 1a2b3c             Use an existing remote document\n  \
        shelf init --user                        Per-user catalog")]
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(long, conflicts_with = "user")]
        path: Option<String>,

        /// Initialize the per-user catalog instead of ./.shelf
        #[arg(long)]
        user: bool,

        /// Existing remote document ID
        #[arg(long, value_parser = non_empty_string)]
        document: Option<String>,

        /// Document API base URL
        #[arg(long)]
        api_url: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Show cache statistics
    Stats {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Evict stale cache entries
    Cleanup,

    /// Delete the cached catalog and sync metadata
    Clear {
        /// Also drop pending offline operations
        #[arg(long)]
        queue: bool,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
