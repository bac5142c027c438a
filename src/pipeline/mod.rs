//! Mining pipeline orchestration
//!
//! Runs the per-repository pipeline (paginate -> timeline -> classify ->
//! select snapshots) and drives it across repositories in parallel.
//! Repository pipelines are independent; the only shared state is the
//! rate-limit coordinator, so a failure in one repository is recorded and
//! never aborts its siblings. Authentication failure is the exception: it
//! aborts the whole batch, since no repository can make progress.

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::archive::{Archive, Source};
use crate::config::Config;
use crate::github::{CommitSource, FetchError, Paginator, RateLimiter};
use crate::input::RepoSpec;
use crate::lifecycle::{classify, select_snapshots, Timeline};
use crate::models::{Cycle, RepoStatus, Repository, RunLogEntry, Snapshot};

/// Everything mined for one repository, persisted as `mining.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMining {
    pub repo: Repository,
    pub category: String,
    pub cycles: Vec<Cycle>,
    /// Pre/post pairs for every resolved cycle
    pub snapshots: Vec<Snapshot>,
    pub commit_count: usize,
    pub pages_fetched: usize,
    pub page_size: usize,
    pub status: RepoStatus,
}

/// Batch-level statistics for the final report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub with_commits: usize,
    pub with_cycles: usize,
    /// Open final cycle and no resurrection at all
    pub dead: usize,
    /// At least one resolved cycle
    pub resurrected: usize,
    /// Died again after a resurrection
    pub died_again: usize,
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_minings(minings: &[RepoMining]) -> Self {
        let mut summary = Self {
            total: minings.len(),
            ..Default::default()
        };
        for m in minings {
            if m.commit_count > 0 {
                summary.with_commits += 1;
            }
            if !m.cycles.is_empty() {
                summary.with_cycles += 1;
            }
            let resolved = m.cycles.iter().filter(|c| c.is_resolved()).count();
            if resolved > 0 {
                summary.resurrected += 1;
                if m.cycles.len() > resolved {
                    summary.died_again += 1;
                }
            } else if !m.cycles.is_empty() {
                summary.dead += 1;
            }
            match m.status {
                RepoStatus::Complete => summary.complete += 1,
                RepoStatus::Partial(_) => summary.partial += 1,
                RepoStatus::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Share of mined repositories that resurrected at least once.
    pub fn resurrection_rate(&self) -> f64 {
        let classified = self.dead + self.resurrected;
        if classified == 0 {
            0.0
        } else {
            self.resurrected as f64 / classified as f64
        }
    }

    /// Share of the input that produced any cycle at all.
    pub fn yield_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.with_cycles as f64 / self.total as f64
        }
    }
}

/// Result of the whole batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub minings: Vec<RepoMining>,
    pub log: Vec<RunLogEntry>,
    pub summary: RunSummary,
}

/// Run the full per-repository pipeline for one input record.
///
/// A fetch failure is returned alongside the outcome so the batch driver
/// can distinguish fatal error kinds without parsing status text.
fn run_repo<S: CommitSource>(
    paginator: &Paginator<&S>,
    archive: &Archive,
    config: &Config,
    spec: &RepoSpec,
) -> (RepoMining, RunLogEntry, Option<FetchError>) {
    let repo = &spec.repo;
    let mut errors = Vec::new();

    let resume = archive.load_cursor(repo);
    if let Some(cursor) = resume {
        info!("{}: resuming from page {}", repo.full_name, cursor.page);
    }

    let outcome = match paginator.fetch_all(repo, resume, archive) {
        Ok(outcome) => outcome,
        Err(e) => {
            let status = RepoStatus::Failed(e.to_string());
            let mining = RepoMining {
                repo: repo.clone(),
                category: spec.category.clone(),
                cycles: Vec::new(),
                snapshots: Vec::new(),
                commit_count: 0,
                pages_fetched: 0,
                page_size: config.mining.page_size,
                status: status.clone(),
            };
            let log = RunLogEntry {
                repo: repo.full_name.clone(),
                commits_collected: 0,
                pages_fetched: 0,
                cycles_detected: 0,
                cycles_resolved: 0,
                died_again: false,
                pre_snapshot: None,
                post_snapshot: None,
                errors: vec![e.to_string()],
                status,
            };
            return (mining, log, Some(e));
        }
    };

    if let Err(e) = archive.write_source(repo, Source::Commits, &outcome.commits) {
        // Archival is best-effort; the in-memory pipeline continues.
        warn!("{}: failed to archive commits: {e}", repo.full_name);
        errors.push(format!("archive: {e}"));
    }
    if outcome.complete {
        archive.clear_cursor(repo);
    }

    let pages_fetched = outcome.pages_fetched;
    let timeline = Timeline::build(outcome.commits, pages_fetched);
    let cycles = classify(&repo.full_name, &timeline, config.mining.gap_threshold_days);

    let mut snapshots = Vec::new();
    for cycle in &cycles {
        match select_snapshots(&repo.full_name, cycle) {
            Ok((pre, post)) => {
                snapshots.push(pre);
                snapshots.push(post);
            }
            Err(e) => {
                // Open cycle: reported, kept out of the dataset.
                info!("{e}");
                errors.push(e.to_string());
            }
        }
    }

    let resolved = cycles.iter().filter(|c| c.is_resolved()).count();
    let status = if !errors.is_empty() {
        RepoStatus::Partial(errors.join("; "))
    } else {
        RepoStatus::Complete
    };

    let log = RunLogEntry {
        repo: repo.full_name.clone(),
        commits_collected: timeline.len(),
        pages_fetched,
        cycles_detected: cycles.len(),
        cycles_resolved: resolved,
        died_again: cycles.len() > 1,
        pre_snapshot: snapshots.first().map(|s| s.sha.clone()),
        post_snapshot: snapshots.get(1).map(|s| s.sha.clone()),
        errors,
        status: status.clone(),
    };

    let mining = RepoMining {
        repo: repo.clone(),
        category: spec.category.clone(),
        cycles,
        snapshots,
        commit_count: timeline.len(),
        pages_fetched,
        page_size: config.mining.page_size,
        status,
    };

    (mining, log, None)
}

/// Drive the pipeline across all repositories, `workers` at a time.
///
/// Returns an error only for authentication failure; every other failure
/// is isolated in that repository's outcome.
pub fn run_batch<S: CommitSource>(
    source: &S,
    specs: &[RepoSpec],
    archive: &Archive,
    config: &Config,
    progress: Option<&indicatif::ProgressBar>,
) -> Result<BatchOutcome> {
    let limiter = Arc::new(RateLimiter::new());
    let results: Mutex<Vec<(usize, RepoMining, RunLogEntry, Option<FetchError>)>> =
        Mutex::new(Vec::with_capacity(specs.len()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.run.workers)
        .build()?;

    pool.install(|| {
        specs.par_iter().enumerate().for_each(|(i, spec)| {
            let paginator = Paginator::new(
                source,
                Arc::clone(&limiter),
                config.mining.clone(),
                config.retry.clone(),
            );
            let (mining, log, fetch_err) = run_repo(&paginator, archive, config, spec);
            if let Some(bar) = progress {
                bar.inc(1);
            }
            results
                .lock()
                .expect("results poisoned")
                .push((i, mining, log, fetch_err));
        });
    });

    let mut results = results.into_inner().expect("results poisoned");
    // par_iter completion order is arbitrary; restore input order.
    results.sort_by_key(|(i, _, _, _)| *i);

    // Credentials are a precondition for any progress: an auth failure in
    // any pipeline means the token is bad for all of them.
    let auth_failure = results.iter().find_map(|(_, _, _, err)| match err {
        Some(e @ FetchError::Auth(_)) => Some(e.to_string()),
        _ => None,
    });
    if let Some(reason) = auth_failure {
        anyhow::bail!("run aborted: {reason}");
    }

    let (minings, log): (Vec<_>, Vec<_>) =
        results.into_iter().map(|(_, m, l, _)| (m, l)).unzip();
    let summary = RunSummary::from_minings(&minings);

    Ok(BatchOutcome {
        minings,
        log,
        summary,
    })
}
