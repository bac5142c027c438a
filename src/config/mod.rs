//! Configuration support
//!
//! Loads run configuration from a `lazarus.toml` file in the working
//! directory (or a path passed on the command line). Every option has a
//! default, so the file is optional.
//!
//! # Configuration Format
//!
//! ```toml
//! # lazarus.toml
//!
//! [mining]
//! # Minimum inactivity (days) that counts as a death event.
//! # The literature uses both "180 days" and "6 months"; this is the
//! # single knob that decides it for a run.
//! gap_threshold_days = 180
//! max_commits = 500
//! page_size = 100
//!
//! [retry]
//! max_retries = 3
//! backoff_base_secs = 5
//! backoff_cap_secs = 300
//!
//! [run]
//! # Priority list of input categories to process
//! sources = ["resurrected"]
//! workers = 8
//! ```

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "lazarus.toml";

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Death detection and pagination bounds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MiningConfig {
    /// Minimum inactivity gap (days) that qualifies as a death
    #[serde(default = "default_gap_threshold_days")]
    pub gap_threshold_days: i64,
    /// Maximum commits fetched per repository
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    /// Commits per page (GitHub caps this at 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            gap_threshold_days: default_gap_threshold_days(),
            max_commits: default_max_commits(),
            page_size: default_page_size(),
        }
    }
}

/// Backoff-and-retry bounds for the paginator.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
        }
    }
}

/// Batch-driver options.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Priority list of input categories ("resurrected", "control")
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Parallel repository pipelines
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            workers: default_workers(),
        }
    }
}

fn default_gap_threshold_days() -> i64 {
    180
}
fn default_max_commits() -> usize {
    500
}
fn default_page_size() -> usize {
    100
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_secs() -> u64 {
    5
}
fn default_backoff_cap_secs() -> u64 {
    300
}
fn default_sources() -> Vec<String> {
    vec!["resurrected".to_string()]
}
fn default_workers() -> usize {
    8
}

/// Load configuration from `dir/lazarus.toml`.
///
/// A missing file yields defaults. A malformed file is logged and also
/// yields defaults, so a bad config never aborts a run.
pub fn load_config(dir: &Path) -> Config {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        debug!("No {} found, using defaults", CONFIG_FILE);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<Config>(&content) {
            Ok(config) => {
                debug!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {e}. Using defaults.", path.display());
                Config::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {e}. Using defaults.", path.display());
            Config::default()
        }
    }
}
