//! Lazarus - GitHub repository death and resurrection mining
//!
//! Paginates commit histories, detects inactivity gaps (deaths) and the
//! commits that ended them (resurrections), selects before/after
//! snapshots, and aggregates collector metrics into analysis-ready
//! features and changes tables.

// Allow dead code for API helpers kept for collector tooling and tests
#![allow(dead_code)]

mod aggregate;
mod archive;
mod cli;
mod config;
mod github;
mod input;
mod lifecycle;
mod models;
mod pipeline;
mod reporters;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli)
}
