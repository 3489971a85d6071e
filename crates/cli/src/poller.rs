//! Bounded status polling.
//!
//! The applicant's side of a decision: ask the server for a stage on a fixed
//! interval until the admin has acted or the attempts run out. The loop
//! holds no state besides the attempt counter.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    /// Every 2 seconds for 5 minutes.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 150,
        }
    }
}

impl PollPolicy {
    /// Total time the policy waits before giving up.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// How polling ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<S> {
    /// The first value that satisfied the settle check.
    Settled(S),
    /// Every attempt returned an unsettled value or an error.
    NoResponse { attempts: u32 },
}

/// Call `fetch` until `is_settled` accepts its value.
///
/// Errors from `fetch` are logged and count as attempts; a flaky network
/// never aborts the loop early, and a dead one ends in `NoResponse`.
pub async fn poll_until_settled<S, E, F, Fut, P>(
    policy: PollPolicy,
    mut fetch: F,
    is_settled: P,
) -> PollOutcome<S>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, E>>,
    E: Display,
    P: Fn(&S) -> bool,
{
    for attempt in 1..=policy.max_attempts {
        match fetch().await {
            Ok(value) if is_settled(&value) => return PollOutcome::Settled(value),
            Ok(_) => debug!(attempt, "Still pending"),
            Err(e) => warn!(attempt, error = %e, "Status check failed"),
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    PollOutcome::NoResponse {
        attempts: policy.max_attempts,
    }
}
