//! Repository lifecycle analysis
//!
//! Turns paginated commit history into an ordered timeline, runs the
//! death/resurrection state machine over it, and binds resolved cycles to
//! concrete pre/post snapshot commits. Everything here is pure and
//! synchronous; the only I/O in the system lives in `github`.

mod classifier;
mod snapshot;

pub use classifier::{classify, LifecycleState};
pub use snapshot::{select_snapshots, SnapshotError};

use crate::models::CommitRecord;

/// An ordered, per-repository commit sequence.
#[derive(Debug, Clone)]
pub struct Timeline {
    commits: Vec<CommitRecord>,
    /// Pages the paginator actually retrieved, for the validator's
    /// pagination sanity check
    pub pages_fetched: usize,
}

impl Timeline {
    /// Build a timeline from retrieved commits.
    ///
    /// GitHub serves history newest-first; the timeline is oldest-first.
    /// The sort is stable, so equal timestamps keep their retrieval order
    /// rather than being re-sorted by identifier.
    pub fn build(mut commits: Vec<CommitRecord>, pages_fetched: usize) -> Self {
        commits.reverse();
        commits.sort_by_key(|c| c.timestamp);
        Self {
            commits,
            pages_fetched,
        }
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::commit_on;
    use super::*;

    #[test]
    fn test_timeline_is_oldest_first() {
        // Retrieval order is newest-first, as the API serves it.
        let commits = vec![
            commit_on(2, 2021, 3, 10),
            commit_on(1, 2019, 8, 1),
            commit_on(0, 2019, 1, 15),
        ];
        let timeline = Timeline::build(commits, 1);
        let stamps: Vec<_> = timeline.commits().iter().map(|c| c.timestamp).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn test_monotonic_timestamps() {
        let commits: Vec<_> = (0..30).rev().map(|n| commit_on(n, 2019, 1, 1 + n as u32 % 28)).collect();
        let timeline = Timeline::build(commits, 1);
        for pair in timeline.commits().windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_equal_timestamps_keep_retrieval_order() {
        // Two commits at the same instant: after the newest-first reversal,
        // retrieval order is preserved by the stable sort.
        let commits = vec![commit_on(2, 2019, 1, 15), commit_on(1, 2019, 1, 15)];
        let timeline = Timeline::build(commits, 1);
        let shas: Vec<String> = timeline.commits().iter().map(|c| c.sha.clone()).collect();
        assert_eq!(shas, vec![format!("{:040x}", 1), format!("{:040x}", 2)]);
    }
}
