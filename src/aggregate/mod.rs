//! Feature aggregation with deltas
//!
//! Merges externally computed per-snapshot metrics into one feature row
//! per (repository, cycle, phase), then derives one delta row per
//! resolved cycle. The aggregator never computes metrics itself: external
//! collectors cover the three pillars (engagement, activity, quality) and
//! this module only merges and differences what they produced.

pub mod validate;

use crate::models::{DeltaRow, FeatureRow, MetricDelta, MetricValue, Phase, Snapshot};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Metrics produced by one named external collector, keyed by
/// (repository, cycle, phase).
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorOutput {
    /// Collector name ("commit_activity", "pull_requests", "issues",
    /// "engagement_files", "quality", ...)
    pub collector: String,
    #[serde(default)]
    pub rows: Vec<CollectorRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorRow {
    pub repo: String,
    pub cycle: usize,
    pub phase: Phase,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Merges collector outputs over snapshots.
pub struct Aggregator {
    /// Union of all metric names seen across collectors; the required
    /// column set for every row
    columns: Vec<String>,
    /// (repo, cycle, phase) -> merged metrics
    by_key: BTreeMap<(String, usize, Phase), BTreeMap<String, MetricValue>>,
}

impl Aggregator {
    /// Index collector outputs for merging.
    pub fn new(outputs: &[CollectorOutput]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut by_key: BTreeMap<(String, usize, Phase), BTreeMap<String, MetricValue>> =
            BTreeMap::new();

        for output in outputs {
            debug!(
                "Indexing collector '{}' ({} rows)",
                output.collector,
                output.rows.len()
            );
            for row in &output.rows {
                let key = (row.repo.clone(), row.cycle, row.phase);
                let merged = by_key.entry(key).or_default();
                for (name, value) in &row.metrics {
                    if !columns.contains(name) {
                        columns.push(name.clone());
                    }
                    merged.insert(name.clone(), *value);
                }
            }
        }

        columns.sort();
        Self { columns, by_key }
    }

    /// The required metric column set (union over all collectors).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Produce the feature row for one snapshot.
    ///
    /// Every required column is present: a metric absent from all
    /// collectors for this snapshot is recorded as an explicit NA,
    /// never omitted or imputed.
    pub fn feature_row(&self, snapshot: &Snapshot) -> FeatureRow {
        let key = (snapshot.repo.clone(), snapshot.cycle, snapshot.phase);
        let collected = self.by_key.get(&key);

        let mut metrics = BTreeMap::new();
        for column in &self.columns {
            let value = collected
                .and_then(|m| m.get(column))
                .copied()
                .unwrap_or(MetricValue::Na);
            metrics.insert(column.clone(), value);
        }

        FeatureRow {
            repo: snapshot.repo.clone(),
            cycle: snapshot.cycle,
            phase: snapshot.phase,
            metrics,
        }
    }
}

/// Compute the delta row for one cycle's pre/post feature rows.
///
/// `delta = post - pre`; `percent_change = delta / pre`. NA propagates:
/// the delta is NA when either side is NA, and percent change is NA when
/// the delta is NA or `pre` is zero.
pub fn delta_row(pre: &FeatureRow, post: &FeatureRow) -> DeltaRow {
    debug_assert_eq!(pre.repo, post.repo);
    debug_assert_eq!(pre.cycle, post.cycle);

    let mut deltas = BTreeMap::new();
    for (name, pre_value) in &pre.metrics {
        let post_value = post.metrics.get(name).copied().unwrap_or(MetricValue::Na);
        deltas.insert(name.clone(), diff_metric(*pre_value, post_value));
    }
    // Columns only the post row carries still appear, as NA deltas.
    for name in post.metrics.keys() {
        if !deltas.contains_key(name) {
            deltas.insert(
                name.clone(),
                MetricDelta {
                    delta: MetricValue::Na,
                    percent_change: MetricValue::Na,
                },
            );
        }
    }

    DeltaRow {
        repo: pre.repo.clone(),
        cycle: pre.cycle,
        deltas,
    }
}

fn diff_metric(pre: MetricValue, post: MetricValue) -> MetricDelta {
    match (pre.as_num(), post.as_num()) {
        (Some(p), Some(q)) => {
            let delta = q - p;
            let percent_change = if p == 0.0 {
                MetricValue::Na
            } else {
                MetricValue::num(delta / p)
            };
            MetricDelta {
                delta: MetricValue::num(delta),
                percent_change,
            }
        }
        _ => MetricDelta {
            delta: MetricValue::Na,
            percent_change: MetricValue::Na,
        },
    }
}
