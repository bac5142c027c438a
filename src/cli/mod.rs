//! CLI command definitions and handlers

mod aggregate;
mod init;
mod mine;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Lazarus - GitHub repository death and resurrection mining
#[derive(Parser, Debug)]
#[command(name = "lazarus")]
#[command(
    version,
    about = "Mine GitHub commit histories for death/resurrection cycles and build before/after metric datasets",
    long_about = "Lazarus paginates each repository's commit history, detects inactivity \
gaps at or above a configurable threshold (deaths), pairs them with the commits that \
ended them (resurrections), and selects before/after snapshots for every resolved \
cycle. Collector metrics are then aggregated into features and changes tables, with \
an integrity validator over the result.\n\n\
Requires a GITHUB_TOKEN environment variable for the mine step.",
    after_help = "\
Examples:
  lazarus init                                 Write an example lazarus.toml
  lazarus mine repos.json -o out               Mine every repo listed in repos.json
  lazarus mine repos.json -o out --sources resurrected,control
  lazarus aggregate -o out --collectors metrics/
  lazarus validate -o out                      Integrity checks, exit 1 on violation

Configuration is read from lazarus.toml in the working directory."
)]
pub struct Cli {
    /// Directory holding lazarus.toml (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64), overrides the config file
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a lazarus.toml config file with example settings
    Init,

    /// Mine commit histories and detect death/resurrection cycles
    #[command(after_help = "\
Examples:
  lazarus mine repos.json -o out               Mine with config defaults
  lazarus mine repos.json -o out --sources resurrected,control
  lazarus mine repos.json -o out --format json --quiet

The input file is a JSON array of repository rows. Each row needs an
owner/name field; death/revival dates and a category are optional.
Interrupted runs resume from per-repository cursor checkpoints.")]
    Mine {
        /// Input repository list (JSON array)
        input: PathBuf,

        /// Output directory for the archive, run log, and mining results
        #[arg(long, short = 'o', default_value = "out")]
        output: PathBuf,

        /// Categories to mine, comma separated (overrides the config file)
        #[arg(long, value_delimiter = ',')]
        sources: Option<Vec<String>>,

        /// Summary format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Suppress the progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// Build the features and changes tables from mined snapshots
    #[command(after_help = "\
Examples:
  lazarus aggregate -o out --collectors metrics/

Reads mining.json from the output directory and every *.json collector
file under --collectors, then writes features.{json,csv} and
changes.{json,csv}. Metrics a collector did not produce appear as NA,
never as missing columns.")]
    Aggregate {
        /// Output directory holding mining.json from a prior mine run
        #[arg(long, short = 'o', default_value = "out")]
        output: PathBuf,

        /// Directory of collector output files (*.json)
        #[arg(long)]
        collectors: PathBuf,
    },

    /// Run integrity checks over the aggregated dataset
    #[command(after_help = "\
Examples:
  lazarus validate -o out

Checks temporal ordering, key uniqueness, completeness, pagination
sanity, and delta pairing. Writes validation.json and exits with code 1
if any check found violations.")]
    Validate {
        /// Output directory holding mining.json, features.json, changes.json
        #[arg(long, short = 'o', default_value = "out")]
        output: PathBuf,
    },

    /// Show version information
    Version,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => init::run(&cli.config_dir),

        Commands::Mine {
            input,
            output,
            sources,
            format,
            quiet,
        } => mine::run(
            &cli.config_dir,
            &input,
            &output,
            sources,
            cli.workers,
            &format,
            quiet,
        ),

        Commands::Aggregate { output, collectors } => aggregate::run(&output, &collectors),

        Commands::Validate { output } => validate::run(&output),

        Commands::Version => {
            println!("lazarus {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
