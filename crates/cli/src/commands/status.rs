// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The `status` command: local sync state without touching the network.

use serde::Serialize;

use super::{format_time, Workspace};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::{CacheStats, QueueStats, SyncMetadata};

/// Everything `status` reports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub cache: CacheStats,
    pub sync: SyncMetadata,
    pub queue: QueueStats,
}

pub fn collect(ws: &Workspace) -> Result<StatusReport> {
    let cache = ws.cache();
    Ok(StatusReport {
        cache: cache.cache_stats()?,
        sync: cache.sync_metadata()?,
        queue: ws.queue()?.stats(),
    })
}

pub fn run(output: OutputFormat) -> Result<()> {
    let ws = Workspace::open()?;
    let report = collect(&ws)?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", format_status(&report)),
    }
    Ok(())
}

pub fn format_status(report: &StatusReport) -> String {
    let mut out = String::new();
    let document = report.sync.document_id.as_deref().unwrap_or("none (created on first sync)");
    out.push_str(&format!("Document:  {}\n", document));
    out.push_str(&format!(
        "Device:    {}\n",
        report.cache.device_id.as_deref().unwrap_or("unassigned")
    ));
    out.push_str(&format!(
        "Catalog:   {} audiobooks ({})\n",
        report.cache.entry_count, report.cache.sync_status
    ));
    out.push_str(&format!("Modified:  {}\n", format_time(report.cache.last_modified)));
    out.push_str(&format!("Last sync: {}\n", format_time(report.sync.last_sync_time)));
    out.push_str(&format!("Pending:   {} operations", report.queue.total));
    if report.queue.failing > 0 {
        out.push_str(&format!(" ({} failing)", report.queue.failing));
    }
    out.push('\n');
    if let Some(error) = &report.sync.last_error {
        out.push_str(&format!("Last error: {}\n", error));
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
