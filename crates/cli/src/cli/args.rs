// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.

use clap::Args;

use super::OutputFormat;

/// Output format selection.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Optional audiobook fields accepted by `add`.
#[derive(Args, Clone, Debug, Default)]
pub struct EntryArgs {
    /// Author
    #[arg(long, short, value_parser = super::non_empty_string)]
    pub author: String,

    /// Narrator
    #[arg(long, short)]
    pub narrator: Option<String>,

    /// Genre (comma-separated or repeated)
    #[arg(long, short, value_delimiter = ',')]
    pub genre: Vec<String>,

    /// Mood (comma-separated or repeated)
    #[arg(long, short, value_delimiter = ',')]
    pub mood: Vec<String>,

    /// Rating from 1 to 5 (0 for unrated)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub rating: Option<u8>,

    /// Price
    #[arg(long)]
    pub price: Option<f64>,

    /// Store or publisher URL
    #[arg(long)]
    pub url: Option<String>,

    /// Length, e.g. "21h 2m"
    #[arg(long)]
    pub length: Option<String>,

    /// Release date
    #[arg(long)]
    pub release_date: Option<String>,
}
