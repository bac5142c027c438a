//! GitHub REST client: sync HTTP via ureq, no async runtime needed.
//!
//! Fetches one page of commit history per call and reports the rate-limit
//! headers back to the coordinator.

use crate::models::{CommitRecord, Repository};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::paginator::{CommitSource, Cursor, Page};
use super::{FetchError, FetchResult};

const API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("lazarus/", env!("CARGO_PKG_VERSION"));

/// Rate-limit state as reported by GitHub response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Remaining requests in the current window
    pub remaining: Option<u32>,
    /// Unix timestamp at which the window resets
    pub reset: Option<i64>,
}

/// Sync GitHub API client.
pub struct GithubClient {
    agent: ureq::Agent,
    token: String,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // We handle status codes ourselves
        .timeout_global(Some(std::time::Duration::from_secs(30)))
        .build()
        .new_agent()
}

// Commit shape of GET /repos/{owner}/{repo}/commits
#[derive(Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiCommitBody,
}

#[derive(Deserialize)]
struct ApiCommitBody {
    author: Option<ApiIdent>,
    committer: Option<ApiIdent>,
}

#[derive(Deserialize)]
struct ApiIdent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            agent: make_agent(),
            token: token.into(),
        }
    }

    /// Build a client from `GITHUB_TOKEN`. A missing token is an
    /// authentication error before any network call.
    pub fn from_env() -> FetchResult<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| FetchError::Auth("GITHUB_TOKEN not set".to_string()))?;
        if token.trim().is_empty() {
            return Err(FetchError::Auth("GITHUB_TOKEN is empty".to_string()));
        }
        Ok(Self::new(token))
    }

    fn get_json(&self, url: &str) -> FetchResult<(serde_json::Value, RateLimitInfo)> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let limits = RateLimitInfo {
            remaining: header_num(&response, "x-ratelimit-remaining"),
            reset: header_num(&response, "x-ratelimit-reset"),
        };

        let status = response.status().as_u16();
        match status {
            200 => {
                let body: serde_json::Value = response
                    .into_body()
                    .read_json()
                    .map_err(|e| FetchError::Transient(format!("malformed body: {e}")))?;
                Ok((body, limits))
            }
            401 => Err(FetchError::Auth("token rejected (401)".to_string())),
            403 | 429 => {
                let retry_after: Option<i64> = header_num(&response, "retry-after");
                Err(limit_rejection(status, limits, retry_after).unwrap_or(FetchError::Http {
                    status,
                    message: "forbidden".to_string(),
                }))
            }
            // GitHub intermittently serves 502s under load
            500..=599 => Err(FetchError::Transient(format!("server error {status}"))),
            _ => {
                let message = response
                    .into_body()
                    .read_to_string()
                    .unwrap_or_default()
                    .chars()
                    .take(200)
                    .collect();
                Err(FetchError::Http { status, message })
            }
        }
    }
}

/// GitHub signals the primary limit with a zeroed remaining counter and
/// the secondary (abuse) limit with a `retry-after` delay while the
/// remaining counter is still positive. Both get reset-aware backoff.
fn limit_rejection(
    status: u16,
    limits: RateLimitInfo,
    retry_after: Option<i64>,
) -> Option<FetchError> {
    if status == 429 || limits.remaining == Some(0) {
        return Some(FetchError::RateLimited {
            reset: limits.reset,
        });
    }
    retry_after.map(|secs| FetchError::RateLimited {
        reset: Some(Utc::now().timestamp() + secs.max(0)),
    })
}

fn header_num<T: std::str::FromStr>(response: &ureq::http::Response<ureq::Body>, name: &str) -> Option<T> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

impl CommitSource for GithubClient {
    fn fetch_page(&self, repo: &Repository, cursor: &Cursor, page_size: usize) -> FetchResult<Page> {
        let (owner, name) = repo.owner_name().ok_or_else(|| FetchError::Http {
            status: 0,
            message: format!("invalid repository name: {}", repo.full_name),
        })?;

        let url = format!(
            "{API_ROOT}/repos/{owner}/{name}/commits?per_page={page_size}&page={}",
            cursor.page
        );
        debug!("GET {url}");

        let (body, limits) = self.get_json(&url)?;
        let api_commits: Vec<ApiCommit> =
            serde_json::from_value(body).map_err(|e| FetchError::Transient(e.to_string()))?;

        let mut commits = Vec::with_capacity(api_commits.len());
        for c in api_commits {
            // Committer date is the history order GitHub paginates by;
            // fall back to author when the committer block is absent.
            let ident = c.commit.committer.or(c.commit.author);
            let Some(ident) = ident else { continue };
            let Some(date) = ident.date else { continue };
            commits.push(CommitRecord {
                sha: c.sha,
                author: ident.name.unwrap_or_else(|| "unknown".to_string()),
                timestamp: date,
            });
        }

        let exhausted = commits.len() < page_size;
        Ok(Page {
            commits,
            exhausted,
            limits,
        })
    }
}
