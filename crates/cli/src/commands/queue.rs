// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The `queue` command: operations waiting for the next sync.

use serde_json::json;
use shelf_core::QueueOperation;

use super::{format_time, Workspace};
use crate::cli::OutputFormat;
use crate::error::Result;

pub fn run(output: OutputFormat) -> Result<()> {
    let ws = Workspace::open()?;
    let queue = ws.queue()?;
    match output {
        OutputFormat::Json => {
            let value = json!({
                "operations": queue.operations(),
                "stats": queue.stats(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            if queue.is_empty() {
                println!("No pending operations");
            }
            for op in queue.operations() {
                println!("{}", format_operation(op));
            }
        }
    }
    Ok(())
}

/// `update  ab-1a2b3c4d  queued 2026-01-01 00:00:00 UTC (2 retries: timeout)`
pub fn format_operation(op: &QueueOperation) -> String {
    let mut line =
        format!("{:<7} {}  queued {}", op.kind.as_str(), op.id, format_time(Some(op.queued_at)));
    if op.retry_count > 0 {
        let retries = if op.retry_count == 1 { "retry" } else { "retries" };
        line.push_str(&format!(" ({} {}", op.retry_count, retries));
        if let Some(error) = &op.last_error {
            line.push_str(&format!(": {}", error));
        }
        line.push(')');
    }
    line
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
