//! Validate command - integrity checks over the aggregated dataset

use anyhow::{Context, Result};
use console::style;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::aggregate::validate::{validate, CycleBounds, TimelineFacts, ValidationReport};
use crate::archive::read_json;
use crate::models::{DeltaRow, FeatureRow, Phase};
use crate::pipeline::RepoMining;

/// Recover the temporal boundaries of every resolved cycle from the
/// mining results.
pub(crate) fn cycle_bounds(minings: &[RepoMining]) -> Vec<CycleBounds> {
    let mut bounds = Vec::new();
    for mining in minings {
        for cycle in &mining.cycles {
            let Some(revival) = &cycle.revival else {
                continue;
            };
            let pre = mining
                .snapshots
                .iter()
                .find(|s| s.cycle == cycle.index && s.phase == Phase::Pre);
            let post = mining
                .snapshots
                .iter()
                .find(|s| s.cycle == cycle.index && s.phase == Phase::Post);
            if let (Some(pre), Some(post)) = (pre, post) {
                bounds.push(CycleBounds {
                    repo: mining.repo.full_name.clone(),
                    cycle: cycle.index,
                    pre: pre.clone(),
                    death_start: cycle.death.start_commit.timestamp,
                    revival: revival.timestamp,
                    post: post.clone(),
                });
            }
        }
    }
    bounds
}

fn timeline_facts(minings: &[RepoMining]) -> BTreeMap<String, TimelineFacts> {
    minings
        .iter()
        .map(|m| {
            (
                m.repo.full_name.clone(),
                TimelineFacts {
                    commit_count: m.commit_count,
                    pages_fetched: m.pages_fetched,
                    page_size: m.page_size,
                },
            )
        })
        .collect()
}

fn print_report(report: &ValidationReport) {
    for (check, passed) in &report.checks {
        let mark = if *passed {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {mark} {check}");
    }
    for violation in &report.violations {
        println!(
            "    {} {}: {}",
            style("!").red(),
            violation.repo,
            violation.detail
        );
    }
}

pub fn run(output: &Path) -> Result<()> {
    let minings: Vec<RepoMining> = read_json(&output.join("mining.json"))?
        .with_context(|| format!("No mining.json in {}; run `lazarus mine` first", output.display()))?;
    let features: Vec<FeatureRow> = read_json(&output.join("features.json"))?
        .with_context(|| {
            format!("No features.json in {}; run `lazarus aggregate` first", output.display())
        })?;
    let deltas: Vec<DeltaRow> = read_json(&output.join("changes.json"))?.unwrap_or_default();

    // The required column set is the union over the dataset itself.
    let required_columns: Vec<String> = features
        .iter()
        .flat_map(|f| f.metrics.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let report = validate(
        &features,
        &deltas,
        &cycle_bounds(&minings),
        &required_columns,
        &timeline_facts(&minings),
    );

    std::fs::write(
        output.join("validation.json"),
        crate::reporters::json::render_validation(&report)?,
    )
    .context("Failed to write validation.json")?;
    print_report(&report);

    if !report.passed() {
        anyhow::bail!("validation failed: {} violations", report.violations.len());
    }
    println!("{} dataset passed all integrity checks", style("✓").green());
    Ok(())
}
