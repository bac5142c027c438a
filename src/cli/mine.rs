//! Mine command - fetch commit histories and detect lifecycle cycles

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

use crate::archive::{write_json, Archive};
use crate::config::load_config;
use crate::github::GithubClient;
use crate::input::load_repo_specs;
use crate::pipeline::run_batch;
use crate::reporters;

fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap()
        .progress_chars("█▓▒░  ")
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    config_dir: &Path,
    input: &Path,
    output: &Path,
    sources: Option<Vec<String>>,
    workers: Option<usize>,
    format: &str,
    quiet: bool,
) -> Result<()> {
    let mut config = load_config(config_dir);
    if let Some(sources) = sources {
        config.run.sources = sources;
    }
    if let Some(workers) = workers {
        config.run.workers = workers;
    }

    let specs = load_repo_specs(input, &config.run.sources)
        .with_context(|| format!("Failed to load repositories from {}", input.display()))?;
    if specs.is_empty() {
        anyhow::bail!(
            "No repositories matched sources {:?} in {}",
            config.run.sources,
            input.display()
        );
    }
    info!(
        "mining {} repositories with {} workers",
        specs.len(),
        config.run.workers
    );

    let client =
        GithubClient::from_env().context("GITHUB_TOKEN must be set to a valid GitHub token")?;

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let archive = Archive::open(output)?;

    let bar = if quiet {
        None
    } else {
        let bar = ProgressBar::new(specs.len() as u64);
        bar.set_style(create_bar_style());
        bar.set_message("mining");
        Some(bar)
    };

    let outcome = run_batch(&client, &specs, &archive, &config, bar.as_ref())?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    write_json(&output.join("mining.json"), &outcome.minings)?;
    archive.write_run_log(output, &outcome.log)?;

    match format {
        "json" => println!("{}", reporters::json::render(&outcome.summary)?),
        _ => print!("{}", reporters::text::render(&outcome.log, &outcome.summary)?),
    }

    Ok(())
}
