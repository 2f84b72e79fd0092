// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The `cache` subcommands.

use super::{format_time, Workspace};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::{CacheStats, QUEUE_KEY};

pub fn stats(output: OutputFormat) -> Result<()> {
    let ws = Workspace::open()?;
    let stats = ws.cache().cache_stats()?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => print!("{}", format_stats(&stats)),
    }
    Ok(())
}

pub fn format_stats(stats: &CacheStats) -> String {
    if !stats.has_data {
        return "No cached catalog\n".to_string();
    }
    format!(
        "Entries:       {}\nSize:          {} bytes\nStatus:        {}\nLast modified: {}\nLast sync:     {}\n",
        stats.entry_count,
        stats.size_bytes,
        stats.sync_status,
        format_time(stats.last_modified),
        format_time(stats.last_sync_time),
    )
}

pub fn cleanup() -> Result<()> {
    let ws = Workspace::open()?;
    let evicted = ws.cache().cleanup()?;
    println!("Removed {} stale cache entries", evicted);
    Ok(())
}

/// Drops the cached catalog and sync bookkeeping. The next run reloads from
/// the remote document.
pub fn clear(queue: bool) -> Result<()> {
    let ws = Workspace::open()?;
    clear_at(&ws, queue)?;
    if queue {
        println!("Cleared cache and pending operations");
    } else {
        println!("Cleared cache");
    }
    Ok(())
}

pub(crate) fn clear_at(ws: &Workspace, queue: bool) -> Result<()> {
    ws.cache().clear_data()?;
    if queue {
        // Deleted by key so an unreadable queue can still be cleared.
        ws.store.delete(QUEUE_KEY)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
