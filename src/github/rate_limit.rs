//! Shared rate-limit coordinator
//!
//! The API quota is the one mutable resource shared by concurrent
//! repository pipelines. A single mutex owns the remaining-quota/reset
//! state; every paginator acquires it before a network call, so quota
//! checks and backoff waits are serialized and parallel pipelines cannot
//! collectively overrun the window.

use chrono::Utc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

use super::RateLimitInfo;

/// Stop issuing requests once the reported remaining quota drops here.
const QUOTA_FLOOR: u32 = 2;

#[derive(Debug, Default)]
struct QuotaState {
    remaining: Option<u32>,
    reset: Option<i64>,
}

/// Token-bucket style coordinator over the GitHub quota headers.
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<QuotaState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until quota allows another request.
    ///
    /// The lock is held across the sleep, so sibling pipelines queue
    /// behind a depleted window instead of racing into it.
    pub fn acquire(&self) {
        let mut state = self.state.lock().expect("rate limiter poisoned");
        if let Some(remaining) = state.remaining {
            if remaining <= QUOTA_FLOOR {
                let wait = wait_until_reset(state.reset);
                info!(
                    "Quota nearly exhausted ({remaining} left), waiting {}s for reset",
                    wait.as_secs()
                );
                std::thread::sleep(wait);
                // The window has rolled over; forget the stale counter.
                state.remaining = None;
                state.reset = None;
            }
        }
    }

    /// Record quota headers observed on a response.
    pub fn record(&self, info: RateLimitInfo) {
        let mut state = self.state.lock().expect("rate limiter poisoned");
        if info.remaining.is_some() {
            state.remaining = info.remaining;
        }
        if info.reset.is_some() {
            state.reset = info.reset;
        }
    }

    /// Seconds to wait after an explicit rate-limit rejection.
    pub fn rejection_wait(&self, reset: Option<i64>, cap_secs: u64) -> Duration {
        let wait = wait_until_reset(reset);
        wait.min(Duration::from_secs(cap_secs))
    }
}

/// Time until the given unix reset timestamp, with a fixed fallback when
/// no reset header was provided.
fn wait_until_reset(reset: Option<i64>) -> Duration {
    const FALLBACK: Duration = Duration::from_secs(60);
    match reset {
        Some(ts) => {
            let now = Utc::now().timestamp();
            if ts > now {
                // One extra second so we land on the far side of the reset.
                Duration::from_secs((ts - now) as u64 + 1)
            } else {
                Duration::from_secs(1)
            }
        }
        None => FALLBACK,
    }
}
