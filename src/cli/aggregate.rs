//! Aggregate command - merge collector metrics into features and changes

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::{info, warn};

use crate::aggregate::{delta_row, Aggregator, CollectorOutput};
use crate::archive::read_json;
use crate::models::{DeltaRow, FeatureRow, Phase};
use crate::pipeline::RepoMining;
use crate::reporters;

/// Read every `*.json` file under the collectors directory.
fn load_collector_outputs(dir: &Path) -> Result<Vec<CollectorOutput>> {
    let mut outputs = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read collector directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match read_json::<CollectorOutput>(&path)? {
            Some(output) => {
                info!(
                    "collector '{}': {} rows ({})",
                    output.collector,
                    output.rows.len(),
                    path.display()
                );
                outputs.push(output);
            }
            None => warn!("skipping empty collector file {}", path.display()),
        }
    }
    // Directory iteration order is platform-dependent; later collectors
    // win on merge conflicts, so fix the order by name.
    outputs.sort_by(|a, b| a.collector.cmp(&b.collector));
    Ok(outputs)
}

/// Build feature rows for every snapshot and delta rows for every
/// resolved cycle.
pub(crate) fn build_tables(
    minings: &[RepoMining],
    aggregator: &Aggregator,
) -> (Vec<FeatureRow>, Vec<DeltaRow>) {
    let mut features = Vec::new();
    let mut deltas = Vec::new();

    for mining in minings {
        for snapshot in &mining.snapshots {
            features.push(aggregator.feature_row(snapshot));
        }
        for cycle in mining.cycles.iter().filter(|c| c.is_resolved()) {
            let pre = features.iter().find(|f| {
                f.repo == mining.repo.full_name && f.cycle == cycle.index && f.phase == Phase::Pre
            });
            let post = features.iter().find(|f| {
                f.repo == mining.repo.full_name && f.cycle == cycle.index && f.phase == Phase::Post
            });
            if let (Some(pre), Some(post)) = (pre, post) {
                deltas.push(delta_row(pre, post));
            }
        }
    }

    (features, deltas)
}

pub fn run(output: &Path, collectors: &Path) -> Result<()> {
    let minings: Vec<RepoMining> = read_json(&output.join("mining.json"))?
        .with_context(|| format!("No mining.json in {}; run `lazarus mine` first", output.display()))?;

    let outputs = load_collector_outputs(collectors)?;
    if outputs.is_empty() {
        anyhow::bail!("No collector files found in {}", collectors.display());
    }

    let aggregator = Aggregator::new(&outputs);
    let (features, deltas) = build_tables(&minings, &aggregator);

    std::fs::write(
        output.join("features.json"),
        reporters::json::render_features(&features)?,
    )
    .context("Failed to write features.json")?;
    std::fs::write(
        output.join("changes.json"),
        reporters::json::render_changes(&deltas)?,
    )
    .context("Failed to write changes.json")?;
    std::fs::write(
        output.join("features.csv"),
        reporters::csv::render_features(&features),
    )
    .context("Failed to write features.csv")?;
    std::fs::write(
        output.join("changes.csv"),
        reporters::csv::render_changes(&deltas),
    )
    .context("Failed to write changes.csv")?;

    println!(
        "{} {} feature rows, {} change rows, {} metric columns -> {}",
        style("✓").green(),
        features.len(),
        deltas.len(),
        aggregator.columns().len(),
        style(output.display()).cyan()
    );

    Ok(())
}
