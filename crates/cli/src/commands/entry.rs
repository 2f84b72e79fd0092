// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog mutation and listing commands.
//!
//! Every mutation goes through the sync manager so it is cached and queued
//! before the command returns. Nothing here talks to the remote directly.

use shelf_core::{Collection, Entry};

use super::Workspace;
use crate::cli::{EntryArgs, OutputFormat};
use crate::error::{Error, Result};
use crate::id::generate_unique_id;
use crate::sync::{SyncManager, Transport};

/// Builds a new entry from command-line fields.
pub fn build_entry(
    collection: &Collection,
    title: &str,
    args: EntryArgs,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Entry> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::FieldEmpty { field: "Title" });
    }
    let author = args.author.trim();
    if author.is_empty() {
        return Err(Error::FieldEmpty { field: "Author" });
    }

    let id = generate_unique_id(title, author, &now, |id| collection.contains(id));
    let mut entry = Entry::new(id, title);
    entry.author = author.to_string();
    entry.narrator = args.narrator.unwrap_or_default();
    entry.url = args.url.unwrap_or_default();
    entry.length = args.length.unwrap_or_default();
    entry.release_date = args.release_date.unwrap_or_default();
    entry.rating = args.rating.unwrap_or(0);
    entry.price = args.price.unwrap_or(0.0);
    entry.genres = clean_tags(args.genre);
    entry.moods = clean_tags(args.mood);
    Ok(entry)
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

pub fn add(title: String, args: EntryArgs) -> Result<()> {
    super::block_on(async {
        let ws = Workspace::open()?;
        let manager = ws.manager().await?;
        let entry = add_with(&ws, &manager, &title, args).await?;
        println!("Added {}: {}", entry.id, entry.title);
        Ok(())
    })
}

pub(crate) async fn add_with<T: Transport>(
    ws: &Workspace,
    manager: &SyncManager<T>,
    title: &str,
    args: EntryArgs,
) -> Result<Entry> {
    let collection = manager.collection().await;
    let entry = build_entry(&collection, title, args, ws.clock.now())?;
    Ok(manager.add_audiobook(entry).await?)
}

pub fn edit(id: &str, field: &str, value: &str) -> Result<()> {
    super::block_on(async {
        let ws = Workspace::open()?;
        let manager = ws.manager().await?;
        let entry = edit_with(&manager, id, field, value).await?;
        println!("Updated {} {}: {}", entry.id, field, value);
        Ok(())
    })
}

pub(crate) async fn edit_with<T: Transport>(
    manager: &SyncManager<T>,
    id: &str,
    field: &str,
    value: &str,
) -> Result<Entry> {
    let mut entry = manager
        .collection()
        .await
        .get(id)
        .cloned()
        .ok_or_else(|| shelf_core::Error::EntryNotFound(id.to_string()))?;
    entry.set_field(field, value)?;
    Ok(manager.update_audiobook(entry).await?)
}

pub fn remove(id: &str) -> Result<()> {
    super::block_on(async {
        let ws = Workspace::open()?;
        let manager = ws.manager().await?;
        let removed = manager.remove_audiobook(id).await?;
        println!("Removed {}: {}", removed.id, removed.title);
        Ok(())
    })
}

pub fn genre(name: &str) -> Result<()> {
    super::block_on(async {
        let ws = Workspace::open()?;
        let manager = ws.manager().await?;
        if manager.add_custom_genre(name).await? {
            println!("Added genre: {}", name.trim());
        } else {
            println!("Genre already exists: {}", name.trim());
        }
        Ok(())
    })
}

pub fn mood(name: &str) -> Result<()> {
    super::block_on(async {
        let ws = Workspace::open()?;
        let manager = ws.manager().await?;
        if manager.add_custom_mood(name).await? {
            println!("Added mood: {}", name.trim());
        } else {
            println!("Mood already exists: {}", name.trim());
        }
        Ok(())
    })
}

pub fn list(output: OutputFormat) -> Result<()> {
    super::block_on(async {
        let ws = Workspace::open()?;
        let collection = ws.manager().await?.collection().await;
        match output {
            OutputFormat::Json => println!("{}", collection.to_pretty_json()?),
            OutputFormat::Text => {
                if collection.is_empty() {
                    println!("No audiobooks");
                }
                for entry in &collection.audiobooks {
                    println!("{}", format_line(entry));
                }
            }
        }
        Ok(())
    })
}

pub fn show(id: &str, output: OutputFormat) -> Result<()> {
    super::block_on(async {
        let ws = Workspace::open()?;
        let collection = ws.manager().await?.collection().await;
        let entry = collection
            .get(id)
            .ok_or_else(|| shelf_core::Error::EntryNotFound(id.to_string()))?;
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entry)?),
            OutputFormat::Text => print!("{}", format_details(entry)),
        }
        Ok(())
    })
}

/// One-line summary: `ab-1a2b3c4d  Dune by Frank Herbert [5/5]`.
pub fn format_line(entry: &Entry) -> String {
    let mut line = format!("{}  {}", entry.id, entry.title);
    if !entry.author.is_empty() {
        line.push_str(&format!(" by {}", entry.author));
    }
    if entry.rating > 0 {
        line.push_str(&format!(" [{}/5]", entry.rating));
    }
    line
}

pub fn format_details(entry: &Entry) -> String {
    let mut out = format!("{}\n  Title: {}\n", entry.id, entry.title);
    let fields = [
        ("Author", entry.author.as_str()),
        ("Narrator", entry.narrator.as_str()),
        ("Length", entry.length.as_str()),
        ("Released", entry.release_date.as_str()),
        ("URL", entry.url.as_str()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            out.push_str(&format!("  {}: {}\n", label, value));
        }
    }
    if entry.rating > 0 {
        out.push_str(&format!("  Rating: {}/5\n", entry.rating));
    }
    if entry.price > 0.0 {
        out.push_str(&format!("  Price: {:.2}\n", entry.price));
    }
    if !entry.genres.is_empty() {
        out.push_str(&format!("  Genres: {}\n", entry.genres.join(", ")));
    }
    if !entry.moods.is_empty() {
        out.push_str(&format!("  Moods: {}\n", entry.moods.join(", ")));
    }
    if let Some(added) = entry.added_at {
        out.push_str(&format!("  Added: {}\n", super::format_time(Some(added))));
    }
    out
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
