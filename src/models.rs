//! Core data models for Lazarus
//!
//! These models are used throughout the codebase for representing
//! repositories, commit timelines, lifecycle events, and dataset rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A repository under analysis. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Full name in `owner/name` form
    pub full_name: String,
    pub url: String,
    /// Popularity metric (stargazers), if known
    #[serde(default)]
    pub stars: Option<u64>,
    /// Repository creation date, used as the pagination boundary
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// Split the full name into (owner, name).
    pub fn owner_name(&self) -> Option<(&str, &str)> {
        self.full_name.split_once('/')
    }

    /// Filesystem-safe key for archive directories (`owner__name`).
    pub fn archive_key(&self) -> String {
        self.full_name.replace('/', "__")
    }
}

/// One commit in a repository timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// A detected inactivity gap at or above the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// Zero-based cycle index within the repository
    pub cycle: usize,
    /// Last commit before the gap
    pub start_commit: CommitRecord,
    /// Observed gap length in whole days
    pub gap_days: i64,
}

/// One death event paired with its resurrection, if any.
///
/// `revival = None` is an open cycle: the repository died within the
/// observation window and never came back. Open cycles are kept for
/// death-rate statistics but excluded from snapshot selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub index: usize,
    pub death: DeathEvent,
    /// First commit after the gap
    pub revival: Option<CommitRecord>,
}

impl Cycle {
    pub fn is_resolved(&self) -> bool {
        self.revival.is_some()
    }
}

/// Which side of a cycle a snapshot or feature row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Post,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pre => write!(f, "pre"),
            Phase::Post => write!(f, "post"),
        }
    }
}

/// A commit designated as the before/after state for a cycle.
///
/// Uniqueness key is (repository, cycle, phase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub repo: String,
    pub cycle: usize,
    pub phase: Phase,
    pub sha: String,
    pub timestamp: DateTime<Utc>,
}

/// A metric value: numeric, or an explicit NA marker.
///
/// NA is never expressed as omission. A metric a collector did not
/// produce for a snapshot still appears in the row, as `Na`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Num(f64),
    Na,
}

impl MetricValue {
    pub fn num(v: f64) -> Self {
        MetricValue::Num(v)
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            MetricValue::Num(v) => Some(*v),
            MetricValue::Na => None,
        }
    }

    pub fn is_na(&self) -> bool {
        matches!(self, MetricValue::Na)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Num(v) => write!(f, "{v}"),
            MetricValue::Na => write!(f, "NA"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Num(v) => serializer.serialize_f64(*v),
            MetricValue::Na => serializer.serialize_str("NA"),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(MetricValue::Num)
                .ok_or_else(|| D::Error::custom("metric value out of f64 range")),
            serde_json::Value::String(s) if s == "NA" => Ok(MetricValue::Na),
            serde_json::Value::Null => Ok(MetricValue::Na),
            other => Err(D::Error::custom(format!(
                "expected number or \"NA\", got {other}"
            ))),
        }
    }
}

/// One row of the features table: all metrics for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub repo: String,
    pub cycle: usize,
    pub phase: Phase,
    /// Metric name -> value. BTreeMap keeps column order stable.
    pub metrics: BTreeMap<String, MetricValue>,
}

impl FeatureRow {
    /// The (repository, cycle, phase) uniqueness key.
    pub fn key(&self) -> (String, usize, Phase) {
        (self.repo.clone(), self.cycle, self.phase)
    }
}

/// Per-metric change between the two phases of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// post - pre; NA if either side is NA
    pub delta: MetricValue,
    /// (post - pre) / pre; NA if delta is NA or pre is zero
    pub percent_change: MetricValue,
}

/// One row of the changes table: deltas for one resolved cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaRow {
    pub repo: String,
    pub cycle: usize,
    pub deltas: BTreeMap<String, MetricDelta>,
}

/// Terminal status of one repository pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum RepoStatus {
    Complete,
    Partial(String),
    Failed(String),
}

impl std::fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoStatus::Complete => write!(f, "complete"),
            RepoStatus::Partial(reason) => write!(f, "partial: {reason}"),
            RepoStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Execution log entry: one per repository per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub repo: String,
    pub commits_collected: usize,
    pub pages_fetched: usize,
    pub cycles_detected: usize,
    pub cycles_resolved: usize,
    /// More than one inactivity period observed
    pub died_again: bool,
    #[serde(default)]
    pub pre_snapshot: Option<String>,
    #[serde(default)]
    pub post_snapshot: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    pub status: RepoStatus,
}
