//! GitHub commit history ingestion
//!
//! Sync HTTP via ureq against the GitHub REST API, wrapped in a
//! rate-limit-aware, resumable paginator. The network seam is the
//! [`CommitSource`] trait so the paginator and everything above it can be
//! tested against in-memory fakes.

mod client;
mod paginator;
mod rate_limit;

pub use client::{GithubClient, RateLimitInfo};
pub use paginator::{
    CheckpointSink, CommitSource, Cursor, FetchOutcome, NoCheckpoint, Page, Paginator,
};
pub use rate_limit::RateLimiter;

use thiserror::Error;

/// Errors from the GitHub ingestion layer.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Retried with exponential backoff
    #[error("transient network error: {0}")]
    Transient(String),

    /// Retried with reset-aware backoff; surfaced when retries exhaust
    #[error("rate limit exceeded (resets at unix {reset:?})")]
    RateLimited { reset: Option<i64> },

    /// Fatal: credentials are a precondition for any progress
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-retryable HTTP failure (404, malformed response, ...)
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl FetchError {
    /// Whether a bounded retry loop should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transient(_) | FetchError::RateLimited { .. }
        )
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
