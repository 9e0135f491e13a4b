//! Retry policy for collaborator calls.
//!
//! Only transport-level failures are retried; a collaborator that answered
//! with an error status will answer the same way again, so those are final.
//! Backoff is linear: `base_delay × attempt` between attempts.

use std::time::Duration;

use crate::error::PlannerError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before the next attempt, given the 1-based attempt that failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub fn is_retryable(&self, err: &PlannerError) -> bool {
        matches!(err, PlannerError::Transport(_))
    }
}

/// Outcome of a failed [`run`].
#[derive(Debug)]
pub enum RetryFailure {
    /// A non-retryable error, surfaced on the attempt that produced it.
    Fatal(PlannerError),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: PlannerError },
}

/// Runs `op` under the policy, sleeping between retryable failures.
///
/// `op` receives the 1-based attempt number.
pub fn run<T>(
    policy: &RetryPolicy,
    mut op: impl FnMut(u32) -> Result<T, PlannerError>,
) -> Result<T, RetryFailure> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if !policy.is_retryable(&err) => {
                return Err(RetryFailure::Fatal(err));
            }
            Err(err) => {
                if attempt == attempts {
                    return Err(RetryFailure::Exhausted {
                        attempts,
                        last: err,
                    });
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transport failure, retrying"
                );
                std::thread::sleep(delay);
            }
        }
    }

    unreachable!("retry loop returns on the final attempt")
}
