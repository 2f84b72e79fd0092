// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use shelfrs::Cli;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    if let Err(e) = shelfrs::run(cli.command) {
        eprintln!("error: {}", e);
        for hint in e.hints() {
            eprintln!("  hint: {}", hint);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output stays clean.
///
/// `SHELF_LOG` takes a full filter; otherwise `-v` raises the level.
fn setup_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match shelfrs::env::log_filter() {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
