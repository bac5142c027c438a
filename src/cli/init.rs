//! Init command - write an example config file

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

const EXAMPLE_CONFIG: &str = r#"# Lazarus configuration

[mining]
# Inactivity gap, in whole days, that counts as a death
gap_threshold_days = 180

# Commits fetched per repository before the history is truncated
max_commits = 500

# Commits per API page (GitHub caps this at 100)
page_size = 100

[retry]
# Attempts per page beyond the first
max_retries = 3

# Exponential backoff base, in seconds
backoff_base_secs = 5

# Upper bound on any single wait, in seconds
backoff_cap_secs = 300

[run]
# Input categories to mine
sources = ["resurrected"]

# Parallel repository pipelines
workers = 8
"#;

/// Run the init command
pub fn run(dir: &Path) -> Result<()> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", dir.display()))?;
    if !dir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", dir.display());
    }

    let config_path = dir.join("lazarus.toml");
    if config_path.exists() {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    println!("\nNext steps:");
    println!("  {}", style("export GITHUB_TOKEN=\"ghp_...\"").cyan());
    println!("  {}", style("lazarus mine repos.json -o out").cyan());

    Ok(())
}
