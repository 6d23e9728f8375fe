//! Bounded-retry polling for asynchronous invocation results
//!
//! The platform offers no completion notification, so a result is polled until it
//! is ready, a non-transient error occurs, or the retry budget runs out.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::invocation::{InvocationError, InvocationHandle, InvocationService};

/// Default number of retries after the first poll
pub const DEFAULT_MAX_RETRIES: u32 = 18;

/// Default delay between polls
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Errors returned when a result could not be retrieved
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("Fetching result failed: {0}")]
    Failed(#[source] InvocationError),

    #[error("Exhausted retries after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: InvocationError,
    },
}

/// Polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first poll
    pub max_retries: u32,
    /// Fixed delay between polls
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Polling progress for one handle
///
/// Transitions are driven by `advance`, independent of how the caller waits
/// between polls.
#[derive(Debug)]
pub enum PollState {
    Pending { attempts: u32 },
    Ready(String),
    Exhausted { attempts: u32, last: InvocationError },
    Failed(InvocationError),
}

impl PollState {
    pub fn start() -> Self {
        PollState::Pending { attempts: 0 }
    }

    /// Apply the outcome of one poll. Terminal states are returned unchanged.
    pub fn advance(self, fetched: Result<String, InvocationError>, policy: &RetryPolicy) -> Self {
        let attempts = match self {
            PollState::Pending { attempts } => attempts + 1,
            terminal => return terminal,
        };

        match fetched {
            Ok(body) => PollState::Ready(body),
            Err(e) if e.is_not_ready() => {
                if attempts > policy.max_retries {
                    PollState::Exhausted { attempts, last: e }
                } else {
                    PollState::Pending { attempts }
                }
            }
            Err(e) => PollState::Failed(e),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Pending { .. })
    }
}

/// Polls an invocation service for results
#[derive(Clone)]
pub struct ResultRetriever {
    service: Arc<dyn InvocationService>,
    policy: RetryPolicy,
}

impl ResultRetriever {
    pub fn new(service: Arc<dyn InvocationService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll until the result is ready or the budget is spent
    pub async fn fetch(&self, handle: &InvocationHandle) -> Result<String, RetrieveError> {
        let mut state = PollState::start();
        loop {
            let fetched = self.service.fetch_result(handle).await;
            counter!("coldstart_result_polls_total").increment(1);

            state = match state.advance(fetched, &self.policy) {
                PollState::Ready(body) => return Ok(body),
                PollState::Failed(e) => return Err(RetrieveError::Failed(e)),
                PollState::Exhausted { attempts, last } => {
                    warn!(
                        "Activation {} exhausted retries after {} attempts",
                        handle, attempts
                    );
                    return Err(RetrieveError::Exhausted { attempts, last });
                }
                pending => {
                    debug!("Activation {} not ready, retrying in {:?}", handle, self.policy.delay);
                    tokio::time::sleep(self.policy.delay).await;
                    pending
                }
            };
        }
    }
}
