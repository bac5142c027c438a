//! Resumable, rate-limit-aware commit pagination
//!
//! Fetches a repository's history in bounded pages through the
//! [`CommitSource`] seam. Retries are an explicit bounded loop with typed
//! outcomes, not exceptional control flow. After every page the cursor can
//! be persisted through a checkpoint sink, and resuming from that cursor
//! yields the identical remaining sequence.

use crate::config::{MiningConfig, RetryConfig};
use crate::models::{CommitRecord, Repository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use super::{FetchError, FetchResult, RateLimitInfo};

/// Resume position in a repository's history.
///
/// GitHub's REST pagination is page-numbered; `fetched` carries how many
/// commits earlier pages already produced so resumption respects the
/// per-repository cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// 1-based page to fetch next
    pub page: usize,
    /// Commits already retrieved by earlier pages
    pub fetched: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self { page: 1, fetched: 0 }
    }
}

/// One page of commit history.
#[derive(Debug, Clone)]
pub struct Page {
    pub commits: Vec<CommitRecord>,
    /// True when the source reported end-of-history (short page)
    pub exhausted: bool,
    /// Quota headers observed on the response
    pub limits: RateLimitInfo,
}

/// Seam between the paginator and the network.
pub trait CommitSource: Send + Sync {
    fn fetch_page(&self, repo: &Repository, cursor: &Cursor, page_size: usize)
        -> FetchResult<Page>;
}

// One shared client can back many per-repository paginators.
impl<S: CommitSource> CommitSource for &S {
    fn fetch_page(&self, repo: &Repository, cursor: &Cursor, page_size: usize)
        -> FetchResult<Page> {
        (**self).fetch_page(repo, cursor, page_size)
    }
}

/// Receives cursors after each successfully fetched page.
pub trait CheckpointSink {
    fn save(&self, repo: &Repository, cursor: &Cursor);
}

/// No-op sink for callers that do not persist checkpoints.
pub struct NoCheckpoint;

impl CheckpointSink for NoCheckpoint {
    fn save(&self, _repo: &Repository, _cursor: &Cursor) {}
}

/// Outcome of a completed fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    pub commits: Vec<CommitRecord>,
    pub pages_fetched: usize,
    /// Cursor pointing past the last fetched page
    pub cursor: Cursor,
    /// True when the history (or the configured cap) was exhausted
    pub complete: bool,
}

pub struct Paginator<S: CommitSource> {
    source: S,
    limiter: Arc<RateLimiter>,
    mining: MiningConfig,
    retry: RetryConfig,
}

impl<S: CommitSource> Paginator<S> {
    pub fn new(
        source: S,
        limiter: Arc<RateLimiter>,
        mining: MiningConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            source,
            limiter,
            mining,
            retry,
        }
    }

    /// Fetch pages from `resume` (or the beginning) until end-of-history
    /// or the per-repository commit cap, checkpointing after each page.
    pub fn fetch_all(
        &self,
        repo: &Repository,
        resume: Option<Cursor>,
        checkpoints: &dyn CheckpointSink,
    ) -> FetchResult<FetchOutcome> {
        let already = resume.map_or(0, |c| c.fetched);
        let mut cursor = resume.unwrap_or_default();
        let mut commits = Vec::new();
        let mut pages_fetched = 0;

        loop {
            if already + commits.len() >= self.mining.max_commits {
                debug!(
                    "{}: commit cap {} reached",
                    repo.full_name, self.mining.max_commits
                );
                return Ok(FetchOutcome {
                    commits,
                    pages_fetched,
                    cursor,
                    complete: true,
                });
            }

            let page = self.fetch_page_with_retry(repo, &cursor)?;
            pages_fetched += 1;

            let remaining_budget = self
                .mining
                .max_commits
                .saturating_sub(already + commits.len());
            let take = page.commits.len().min(remaining_budget);
            let truncated = take < page.commits.len();
            let exhausted = page.exhausted;
            let page_oldest = page.commits.iter().map(|c| c.timestamp).min();
            commits.extend(page.commits.into_iter().take(take));

            cursor = Cursor {
                page: cursor.page + 1,
                fetched: already + commits.len(),
            };
            // A truncated page still has an unconsumed tail; checkpointing
            // past it would make a resume skip those commits.
            if !truncated {
                checkpoints.save(repo, &cursor);
            }

            let at_creation = match (repo.created_at, page_oldest) {
                (Some(created), Some(oldest)) => oldest <= created,
                _ => false,
            };
            if at_creation {
                debug!("{}: reached creation boundary", repo.full_name);
            }

            if exhausted || at_creation {
                return Ok(FetchOutcome {
                    commits,
                    pages_fetched,
                    cursor,
                    complete: true,
                });
            }
        }
    }

    /// One page with a bounded backoff-and-retry loop.
    fn fetch_page_with_retry(&self, repo: &Repository, cursor: &Cursor) -> FetchResult<Page> {
        let mut last_err: Option<FetchError> = None;

        for attempt in 0..=self.retry.max_retries {
            self.limiter.acquire();

            match self.source.fetch_page(repo, cursor, self.mining.page_size) {
                Ok(page) => {
                    self.limiter.record(page.limits);
                    return Ok(page);
                }
                Err(err @ FetchError::Auth(_)) => return Err(err),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if attempt == self.retry.max_retries {
                        return Err(FetchError::RetriesExhausted {
                            attempts: attempt + 1,
                            last: err.to_string(),
                        });
                    }
                    let wait = self.backoff_for(&err, attempt);
                    warn!(
                        "{} page {}: {err}; retry {}/{} in {}s",
                        repo.full_name,
                        cursor.page,
                        attempt + 1,
                        self.retry.max_retries,
                        wait.as_secs()
                    );
                    std::thread::sleep(wait);
                    last_err = Some(err);
                }
            }
        }

        // The loop always returns; this is only reachable with max_retries
        // overflow, which the config type rules out.
        Err(last_err.unwrap_or(FetchError::RetriesExhausted {
            attempts: self.retry.max_retries,
            last: "unknown".to_string(),
        }))
    }

    fn backoff_for(&self, err: &FetchError, attempt: u32) -> Duration {
        match err {
            FetchError::RateLimited { reset } => self
                .limiter
                .rejection_wait(*reset, self.retry.backoff_cap_secs),
            _ => exponential_backoff(
                self.retry.backoff_base_secs,
                self.retry.backoff_cap_secs,
                attempt,
            ),
        }
    }
}

/// `base * 2^attempt`, capped.
fn exponential_backoff(base_secs: u64, cap_secs: u64, attempt: u32) -> Duration {
    let secs = base_secs.saturating_mul(1u64 << attempt.min(16));
    Duration::from_secs(secs.min(cap_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn test_repo() -> Repository {
        Repository {
            full_name: "octo/cat".into(),
            url: "https://github.com/octo/cat".into(),
            stars: None,
            created_at: None,
        }
    }

    fn commit(n: usize) -> CommitRecord {
        CommitRecord {
            sha: format!("{n:040x}"),
            author: "dev".into(),
            timestamp: Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(n as i64),
        }
    }

    /// In-memory commit source serving a fixed history, optionally
    /// injecting failures before the first success.
    struct FakeSource {
        history: Vec<CommitRecord>,
        failures: Mutex<Vec<FetchError>>,
        calls: Mutex<usize>,
    }

    impl FakeSource {
        fn new(total: usize) -> Self {
            Self {
                history: (0..total).map(commit).collect(),
                failures: Mutex::new(Vec::new()),
                calls: Mutex::new(0),
            }
        }

        fn with_failures(mut self, failures: Vec<FetchError>) -> Self {
            self.failures = Mutex::new(failures);
            self
        }
    }

    impl CommitSource for FakeSource {
        fn fetch_page(
            &self,
            _repo: &Repository,
            cursor: &Cursor,
            page_size: usize,
        ) -> FetchResult<Page> {
            *self.calls.lock().unwrap() += 1;
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }
            let start = (cursor.page - 1) * page_size;
            let commits: Vec<_> = self
                .history
                .iter()
                .skip(start)
                .take(page_size)
                .cloned()
                .collect();
            let exhausted = commits.len() < page_size;
            Ok(Page {
                commits,
                exhausted,
                limits: RateLimitInfo::default(),
            })
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            backoff_base_secs: 0,
            backoff_cap_secs: 0,
        }
    }

    fn mining(page_size: usize, max_commits: usize) -> MiningConfig {
        MiningConfig {
            gap_threshold_days: 180,
            max_commits,
            page_size,
        }
    }

    fn paginator(source: FakeSource, m: MiningConfig) -> Paginator<FakeSource> {
        Paginator::new(source, Arc::new(RateLimiter::new()), m, fast_retry())
    }

    #[test]
    fn test_fetch_all_stops_at_end_of_history() {
        let p = paginator(FakeSource::new(25), mining(10, 500));
        let out = p
            .fetch_all(&test_repo(), None, &NoCheckpoint)
            .expect("fetch");
        assert_eq!(out.commits.len(), 25);
        assert_eq!(out.pages_fetched, 3);
        assert!(out.complete);
    }

    #[test]
    fn test_fetch_all_respects_commit_cap() {
        let p = paginator(FakeSource::new(1000), mining(100, 500));
        let out = p
            .fetch_all(&test_repo(), None, &NoCheckpoint)
            .expect("fetch");
        assert_eq!(out.commits.len(), 500);
        assert_eq!(out.pages_fetched, 5);
    }

    struct RecordingSink {
        saved: Mutex<Vec<Cursor>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    impl CheckpointSink for RecordingSink {
        fn save(&self, _repo: &Repository, cursor: &Cursor) {
            self.saved.lock().unwrap().push(*cursor);
        }
    }

    #[test]
    fn test_cap_applies_once_when_resuming() {
        // 300 commits already on disk from an earlier run; the cap of 500
        // leaves room for exactly two more pages.
        let p = paginator(FakeSource::new(1000), mining(100, 500));
        let resume = Cursor {
            page: 4,
            fetched: 300,
        };
        let out = p
            .fetch_all(&test_repo(), Some(resume), &NoCheckpoint)
            .expect("resumed fetch");
        assert_eq!(out.commits.len(), 200);
        assert_eq!(out.pages_fetched, 2);
        assert_eq!(out.cursor.fetched, 500);
        assert!(out.complete);
    }

    #[test]
    fn test_no_checkpoint_past_unconsumed_commits() {
        // Cap of 25 truncates the third page of 10; its tail was never
        // consumed, so no checkpoint may point past it.
        let p = paginator(FakeSource::new(50), mining(10, 25));
        let sink = RecordingSink::new();
        let out = p.fetch_all(&test_repo(), None, &sink).expect("fetch");
        assert_eq!(out.commits.len(), 25);

        let saved = sink.saved.lock().unwrap();
        assert_eq!(
            saved.last(),
            Some(&Cursor {
                page: 3,
                fetched: 20
            })
        );
    }

    #[test]
    fn test_fetch_all_stops_at_creation_boundary() {
        // Pages arrive newest-first; once the oldest commit on a page is
        // at or before the repository's creation date, stop paginating.
        let mut source = FakeSource::new(50);
        source.history.reverse();
        let created = commit(35).timestamp;
        let repo = Repository {
            created_at: Some(created),
            ..test_repo()
        };
        let p = paginator(source, mining(10, 500));
        let out = p.fetch_all(&repo, None, &NoCheckpoint).expect("fetch");
        // Commits 49..=40 on page 1, 39..=30 on page 2; page 2 reaches
        // commits at or before the creation date.
        assert_eq!(out.pages_fetched, 2);
        assert_eq!(out.commits.len(), 20);
        assert!(out.complete);
    }

    #[test]
    fn test_idempotent_resumption() {
        // Uninterrupted run of 5 pages.
        let p = paginator(FakeSource::new(50), mining(10, 500));
        let full = p
            .fetch_all(&test_repo(), None, &NoCheckpoint)
            .expect("full fetch");

        // Interrupted run: 3 pages, then resume from the checkpoint.
        let p = paginator(FakeSource::new(50), mining(10, 30));
        let first = p
            .fetch_all(&test_repo(), None, &NoCheckpoint)
            .expect("first half");
        assert_eq!(first.commits.len(), 30);

        let p = paginator(FakeSource::new(50), mining(10, 500));
        let second = p
            .fetch_all(&test_repo(), Some(first.cursor), &NoCheckpoint)
            .expect("resumed");

        let mut stitched = first.commits;
        stitched.extend(second.commits);
        assert_eq!(stitched, full.commits);
    }

    #[test]
    fn test_transient_errors_are_retried() {
        let source = FakeSource::new(5).with_failures(vec![
            FetchError::Transient("timeout".into()),
            FetchError::Transient("reset by peer".into()),
        ]);
        let p = paginator(source, mining(10, 500));
        let out = p
            .fetch_all(&test_repo(), None, &NoCheckpoint)
            .expect("fetch despite transients");
        assert_eq!(out.commits.len(), 5);
    }

    #[test]
    fn test_retries_exhausted_surfaces() {
        let source = FakeSource::new(5).with_failures(vec![
            FetchError::Transient("1".into()),
            FetchError::Transient("2".into()),
            FetchError::Transient("3".into()),
            FetchError::Transient("4".into()),
        ]);
        let p = paginator(source, mining(10, 500));
        let err = p.fetch_all(&test_repo(), None, &NoCheckpoint).unwrap_err();
        assert!(matches!(err, FetchError::RetriesExhausted { .. }));
    }

    #[test]
    fn test_auth_error_is_fatal_not_retried() {
        let source = FakeSource::new(5).with_failures(vec![FetchError::Auth("bad token".into())]);
        let p = paginator(source, mining(10, 500));
        let err = p.fetch_all(&test_repo(), None, &NoCheckpoint).unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
        // Exactly one network call: no retry after auth failure.
        assert_eq!(*p.source.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_rate_limited_retries_with_reset() {
        let past_reset = Utc::now().timestamp() - 10;
        let source = FakeSource::new(5).with_failures(vec![FetchError::RateLimited {
            reset: Some(past_reset),
        }]);
        let p = paginator(source, mining(10, 500));
        let out = p
            .fetch_all(&test_repo(), None, &NoCheckpoint)
            .expect("fetch after rate limit");
        assert_eq!(out.commits.len(), 5);
    }

    #[test]
    fn test_exponential_backoff_caps() {
        assert_eq!(exponential_backoff(5, 300, 0), Duration::from_secs(5));
        assert_eq!(exponential_backoff(5, 300, 1), Duration::from_secs(10));
        assert_eq!(exponential_backoff(5, 300, 10), Duration::from_secs(300));
        // Shift amounts beyond 16 are clamped, no overflow
        assert_eq!(exponential_backoff(5, 300, 63), Duration::from_secs(300));
    }
}
