// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The `sync` command.

use std::future::Future;
use std::io::{self, BufRead, IsTerminal, Write};
use std::pin::Pin;
use std::sync::Arc;

use shelf_core::{Collection, ConflictInfo, Resolution};

use super::{format_time, Workspace};
use crate::cli::ConflictChoice;
use crate::error::{Error, Result};
use crate::sync::{
    ConflictHandler, SyncDirection, SyncError, SyncManager, SyncOutcome, SyncReport, Transport,
};

/// Asks on the terminal which side of a conflict to keep.
///
/// Answers `None` without a terminal, which leaves the conflict for a later
/// sync.
struct PromptHandler;

impl ConflictHandler for PromptHandler {
    fn resolve<'a>(
        &'a self,
        info: &'a ConflictInfo,
        local: &'a Collection,
        remote: &'a Collection,
    ) -> Pin<Box<dyn Future<Output = Option<Resolution>> + Send + 'a>> {
        let summary = describe_conflict(info, local, remote);
        Box::pin(async move {
            if !io::stdin().is_terminal() {
                return None;
            }
            tokio::task::spawn_blocking(move || prompt(&summary)).await.ok().flatten()
        })
    }
}

fn describe_conflict(info: &ConflictInfo, local: &Collection, remote: &Collection) -> String {
    format!(
        "Conflict: the remote catalog changed on another device.\n  \
         local:  {} audiobooks, modified {} on {}\n  \
         remote: {} audiobooks, modified {} on {}\n",
        local.len(),
        format_time(Some(info.local_timestamp)),
        info.local_device_id,
        remote.len(),
        format_time(Some(info.remote_timestamp)),
        info.remote_device_id,
    )
}

fn prompt(summary: &str) -> Option<Resolution> {
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{}", summary);
    let stdin = io::stdin();
    loop {
        let _ = write!(stderr, "Keep [l]ocal, keep [r]emote, [m]erge or [q]uit? ");
        let _ = stderr.flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        if let Some(choice) = parse_choice(&line) {
            return choice;
        }
    }
}

/// Reads a prompt answer. `Some(None)` means the user declined to choose;
/// `None` means the answer was not understood.
pub fn parse_choice(input: &str) -> Option<Option<Resolution>> {
    match input.trim().to_ascii_lowercase().as_str() {
        "l" => Some(Some(Resolution::KeepLocal)),
        "r" => Some(Some(Resolution::KeepRemote)),
        "m" => Some(Some(Resolution::Merge)),
        "q" | "quit" => Some(None),
        other => other.parse::<Resolution>().ok().map(Some),
    }
}

pub fn run(on_conflict: ConflictChoice) -> Result<()> {
    super::block_on(async {
        let mut ws = Workspace::open()?;
        let manager = ws.manager().await?;
        let handler: Arc<dyn ConflictHandler> = match on_conflict.resolution() {
            Some(resolution) => Arc::new(resolution),
            None => Arc::new(PromptHandler),
        };
        let manager = manager.with_conflict_handler(handler);

        match sync_with(&mut ws, &manager).await {
            Err(Error::Sync(SyncError::ConflictUnresolved(_)))
                if on_conflict == ConflictChoice::Ask && !io::stdin().is_terminal() =>
            {
                Err(Error::TtyRequired)
            }
            Ok(Some(report)) => {
                print!("{}", format_report(&report));
                Ok(())
            }
            Ok(None) => {
                println!("A sync is already in progress");
                Ok(())
            }
            Err(e) => Err(e),
        }
    })
}

/// Runs one sync and records a newly created document in the config.
pub(crate) async fn sync_with<T: Transport>(
    ws: &mut Workspace,
    manager: &SyncManager<T>,
) -> Result<Option<SyncReport>> {
    match manager.sync().await? {
        SyncOutcome::Completed(report) => {
            if report.direction == SyncDirection::Created {
                ws.remember_document_id(&report.document_id)?;
            }
            Ok(Some(report))
        }
        SyncOutcome::AlreadyInFlight => Ok(None),
    }
}

pub fn format_report(report: &SyncReport) -> String {
    let headline = match report.direction {
        SyncDirection::Created => format!("Created remote document {}", report.document_id),
        SyncDirection::Pulled => "Pulled remote changes".to_string(),
        SyncDirection::Pushed => "Pushed local changes".to_string(),
        SyncDirection::UpToDate => "Already up to date".to_string(),
        SyncDirection::Resolved(resolution) => format!("Resolved conflict ({})", resolution),
    };
    let mut out = format!("{}: {} audiobooks\n", headline, report.entries);
    if report.queue.processed > 0 {
        out.push_str(&format!(
            "  Sent {} of {} queued operations\n",
            report.queue.succeeded, report.queue.processed
        ));
    }
    for failure in report.queue.dropped() {
        out.push_str(&format!(
            "  Dropped {} {}: {}\n",
            failure.kind, failure.id, failure.message
        ));
    }
    if report.pending > 0 {
        out.push_str(&format!("  {} operations still pending\n", report.pending));
    }
    out
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
