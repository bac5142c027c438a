//! Snapshot selection
//!
//! Binds a resolved cycle to its pre-death and post-revival snapshot
//! commits. Open cycles are rejected with a typed error so callers can
//! report them; they are never silently dropped.

use crate::models::{Cycle, Phase, Snapshot};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The cycle has no revival commit (open cycle) or the boundary
    /// commit is otherwise absent.
    #[error("{repo} cycle {cycle}: no {phase} snapshot commit available")]
    NoSnapshotFound {
        repo: String,
        cycle: usize,
        phase: Phase,
    },
}

/// Map one cycle to its (pre, post) snapshot pair.
pub fn select_snapshots(repo: &str, cycle: &Cycle) -> Result<(Snapshot, Snapshot), SnapshotError> {
    let revival = cycle
        .revival
        .as_ref()
        .ok_or_else(|| SnapshotError::NoSnapshotFound {
            repo: repo.to_string(),
            cycle: cycle.index,
            phase: Phase::Post,
        })?;

    let pre = Snapshot {
        repo: repo.to_string(),
        cycle: cycle.index,
        phase: Phase::Pre,
        sha: cycle.death.start_commit.sha.clone(),
        timestamp: cycle.death.start_commit.timestamp,
    };
    let post = Snapshot {
        repo: repo.to_string(),
        cycle: cycle.index,
        phase: Phase::Post,
        sha: revival.sha.clone(),
        timestamp: revival.timestamp,
    };
    Ok((pre, post))
}
