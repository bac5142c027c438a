//! Integrity validation
//!
//! Post-hoc checks over the aggregated dataset. Violations are recorded
//! with enough detail to locate the offending row; nothing is ever
//! auto-corrected.

use crate::models::{DeltaRow, FeatureRow, Phase, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Which invariant a check entry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    TemporalOrdering,
    KeyUniqueness,
    Completeness,
    PaginationSanity,
    DeltaPairing,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckKind::TemporalOrdering => "temporal_ordering",
            CheckKind::KeyUniqueness => "key_uniqueness",
            CheckKind::Completeness => "completeness",
            CheckKind::PaginationSanity => "pagination_sanity",
            CheckKind::DeltaPairing => "delta_pairing",
        };
        write!(f, "{name}")
    }
}

/// A single recorded violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub check: CheckKind,
    pub repo: String,
    /// Cycle index when the violation is cycle-scoped
    pub cycle: Option<usize>,
    pub detail: String,
}

/// Pass/fail per check plus the individual violations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    pub checks: BTreeMap<String, bool>,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    fn record(&mut self, violation: Violation) {
        self.checks.insert(violation.check.to_string(), false);
        self.violations.push(violation);
    }

    fn mark_checked(&mut self, check: CheckKind) {
        self.checks.entry(check.to_string()).or_insert(true);
    }
}

/// Timeline facts the validator needs per repository.
#[derive(Debug, Clone, Copy)]
pub struct TimelineFacts {
    pub commit_count: usize,
    pub pages_fetched: usize,
    pub page_size: usize,
}

/// Temporal boundaries of one resolved cycle.
#[derive(Debug, Clone)]
pub struct CycleBounds {
    pub repo: String,
    pub cycle: usize,
    pub pre: Snapshot,
    pub death_start: chrono::DateTime<chrono::Utc>,
    pub revival: chrono::DateTime<chrono::Utc>,
    pub post: Snapshot,
}

/// Run all integrity checks over the aggregated dataset.
pub fn validate(
    features: &[FeatureRow],
    deltas: &[DeltaRow],
    bounds: &[CycleBounds],
    required_columns: &[String],
    timelines: &BTreeMap<String, TimelineFacts>,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    for check in [
        CheckKind::TemporalOrdering,
        CheckKind::KeyUniqueness,
        CheckKind::Completeness,
        CheckKind::PaginationSanity,
        CheckKind::DeltaPairing,
    ] {
        report.mark_checked(check);
    }

    check_temporal(&mut report, bounds);
    check_uniqueness(&mut report, features, deltas);
    check_completeness(&mut report, features, required_columns);
    check_pagination(&mut report, timelines);
    check_delta_pairing(&mut report, features, deltas);

    report
}

/// `pre.ts <= death_start.ts < revival.ts <= post.ts` for every resolved cycle.
fn check_temporal(report: &mut ValidationReport, bounds: &[CycleBounds]) {
    for b in bounds {
        let ordered = b.pre.timestamp <= b.death_start
            && b.death_start < b.revival
            && b.revival <= b.post.timestamp;
        if !ordered {
            report.record(Violation {
                check: CheckKind::TemporalOrdering,
                repo: b.repo.clone(),
                cycle: Some(b.cycle),
                detail: format!(
                    "pre={} death={} revival={} post={}",
                    b.pre.timestamp, b.death_start, b.revival, b.post.timestamp
                ),
            });
        }
    }
}

/// No duplicate (repository, cycle, phase) feature rows, and no duplicate
/// (repository, cycle) delta rows.
fn check_uniqueness(report: &mut ValidationReport, features: &[FeatureRow], deltas: &[DeltaRow]) {
    let mut seen: HashSet<(String, usize, Phase)> = HashSet::new();
    for row in features {
        if !seen.insert(row.key()) {
            report.record(Violation {
                check: CheckKind::KeyUniqueness,
                repo: row.repo.clone(),
                cycle: Some(row.cycle),
                detail: format!("duplicate feature row ({}, {}, {})", row.repo, row.cycle, row.phase),
            });
        }
    }

    let mut seen_deltas: HashSet<(String, usize)> = HashSet::new();
    for row in deltas {
        if !seen_deltas.insert((row.repo.clone(), row.cycle)) {
            report.record(Violation {
                check: CheckKind::KeyUniqueness,
                repo: row.repo.clone(),
                cycle: Some(row.cycle),
                detail: format!("duplicate delta row ({}, {})", row.repo, row.cycle),
            });
        }
    }
}

/// Every required metric column present (value or explicit NA) on every row.
fn check_completeness(
    report: &mut ValidationReport,
    features: &[FeatureRow],
    required_columns: &[String],
) {
    for row in features {
        for column in required_columns {
            if !row.metrics.contains_key(column) {
                report.record(Violation {
                    check: CheckKind::Completeness,
                    repo: row.repo.clone(),
                    cycle: Some(row.cycle),
                    detail: format!("column {column:?} missing from {} phase row", row.phase),
                });
            }
        }
    }
}

/// A timeline at or above the single-page limit must have come from more
/// than one page.
fn check_pagination(report: &mut ValidationReport, timelines: &BTreeMap<String, TimelineFacts>) {
    for (repo, facts) in timelines {
        if facts.commit_count >= facts.page_size && facts.pages_fetched <= 1 {
            report.record(Violation {
                check: CheckKind::PaginationSanity,
                repo: repo.clone(),
                cycle: None,
                detail: format!(
                    "{} commits with only {} page(s) fetched (page size {})",
                    facts.commit_count, facts.pages_fetched, facts.page_size
                ),
            });
        }
    }
}

/// Every delta row must correspond to exactly one pre and one post
/// feature row.
fn check_delta_pairing(report: &mut ValidationReport, features: &[FeatureRow], deltas: &[DeltaRow]) {
    let keys: HashSet<(String, usize, Phase)> =
        features.iter().map(FeatureRow::key).collect();
    for row in deltas {
        for phase in [Phase::Pre, Phase::Post] {
            if !keys.contains(&(row.repo.clone(), row.cycle, phase)) {
                report.record(Violation {
                    check: CheckKind::DeltaPairing,
                    repo: row.repo.clone(),
                    cycle: Some(row.cycle),
                    detail: format!("delta row without a {phase} feature row"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValue;
    use chrono::{TimeZone, Utc};

    fn ts(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn snapshot(phase: Phase, y: i32, m: u32, d: u32) -> Snapshot {
        Snapshot {
            repo: "octo/cat".into(),
            cycle: 0,
            phase,
            sha: "a".repeat(40),
            timestamp: ts(y, m, d),
        }
    }

    fn feature(repo: &str, cycle: usize, phase: Phase, columns: &[&str]) -> FeatureRow {
        FeatureRow {
            repo: repo.into(),
            cycle,
            phase,
            metrics: columns
                .iter()
                .map(|c| (c.to_string(), MetricValue::num(1.0)))
                .collect(),
        }
    }

    fn good_bounds() -> CycleBounds {
        CycleBounds {
            repo: "octo/cat".into(),
            cycle: 0,
            pre: snapshot(Phase::Pre, 2019, 1, 15),
            death_start: ts(2019, 1, 15),
            revival: ts(2021, 3, 10),
            post: snapshot(Phase::Post, 2021, 3, 10),
        }
    }

    #[test]
    fn test_clean_dataset_passes() {
        let features = vec![
            feature("octo/cat", 0, Phase::Pre, &["commits_count"]),
            feature("octo/cat", 0, Phase::Post, &["commits_count"]),
        ];
        let deltas = vec![DeltaRow {
            repo: "octo/cat".into(),
            cycle: 0,
            deltas: BTreeMap::new(),
        }];
        let mut timelines = BTreeMap::new();
        timelines.insert(
            "octo/cat".to_string(),
            TimelineFacts {
                commit_count: 40,
                pages_fetched: 1,
                page_size: 100,
            },
        );

        let report = validate(
            &features,
            &deltas,
            &[good_bounds()],
            &["commits_count".to_string()],
            &timelines,
        );
        assert!(report.passed(), "{:?}", report.violations);
        assert!(report.checks.values().all(|&ok| ok));
        assert_eq!(report.checks.len(), 5);
    }

    #[test]
    fn test_temporal_violation_recorded() {
        let mut bounds = good_bounds();
        bounds.revival = ts(2018, 1, 1); // before the death
        let report = validate(&[], &[], &[bounds], &[], &BTreeMap::new());
        assert!(!report.passed());
        let v = &report.violations[0];
        assert_eq!(v.check, CheckKind::TemporalOrdering);
        assert_eq!(v.repo, "octo/cat");
        assert_eq!(v.cycle, Some(0));
        assert_eq!(report.checks.get("temporal_ordering"), Some(&false));
    }

    #[test]
    fn test_duplicate_key_detected() {
        let features = vec![
            feature("octo/cat", 0, Phase::Pre, &[]),
            feature("octo/cat", 0, Phase::Pre, &[]),
        ];
        let report = validate(&features, &[], &[], &[], &BTreeMap::new());
        assert!(!report.passed());
        assert_eq!(report.violations[0].check, CheckKind::KeyUniqueness);
    }

    #[test]
    fn test_missing_column_detected() {
        let features = vec![feature("octo/cat", 0, Phase::Pre, &["commits_count"])];
        let report = validate(
            &features,
            &[],
            &[],
            &["commits_count".to_string(), "issues_open".to_string()],
            &BTreeMap::new(),
        );
        assert!(!report.passed());
        let v = &report.violations[0];
        assert_eq!(v.check, CheckKind::Completeness);
        assert!(v.detail.contains("issues_open"));
    }

    #[test]
    fn test_pagination_sanity() {
        let mut timelines = BTreeMap::new();
        timelines.insert(
            "octo/cat".to_string(),
            TimelineFacts {
                commit_count: 100,
                pages_fetched: 1,
                page_size: 100,
            },
        );
        let report = validate(&[], &[], &[], &[], &timelines);
        assert!(!report.passed());
        assert_eq!(report.violations[0].check, CheckKind::PaginationSanity);

        // Two pages for the same count is fine.
        let mut timelines = BTreeMap::new();
        timelines.insert(
            "octo/cat".to_string(),
            TimelineFacts {
                commit_count: 100,
                pages_fetched: 2,
                page_size: 100,
            },
        );
        assert!(validate(&[], &[], &[], &[], &timelines).passed());
    }

    #[test]
    fn test_unpaired_delta_detected() {
        let features = vec![feature("octo/cat", 0, Phase::Pre, &[])];
        let deltas = vec![DeltaRow {
            repo: "octo/cat".into(),
            cycle: 0,
            deltas: BTreeMap::new(),
        }];
        let report = validate(&features, &deltas, &[], &[], &BTreeMap::new());
        assert!(!report.passed());
        let v = &report.violations[0];
        assert_eq!(v.check, CheckKind::DeltaPairing);
        assert!(v.detail.contains("post"));
    }
}
