//! Retry Policy
//!
//! Bounded retry with linear backoff for flaky or contended remote
//! operations. The delay grows as `attempt_index * delay_unit`, so the
//! first retry is immediate and later ones back off steadily.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// A bounded, linear-backoff retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_unit: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_unit: Duration) -> Self {
        Self {
            // A zero budget still runs the operation once.
            max_attempts: max_attempts.max(1),
            delay_unit,
        }
    }

    /// Create a policy with a custom attempt budget and the default delay
    /// unit.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, Self::default().delay_unit)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after the given zero-based attempt fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_unit * attempt
    }

    /// Invoke `operation` until it succeeds or the attempt budget is
    /// exhausted, sleeping `attempt * delay_unit` between attempts. On
    /// exhaustion the most recent error is returned.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_error = Some(e);
                    if attempt + 1 < self.max_attempts {
                        sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }
        Err(last_error.expect("at least one attempt always runs"))
    }
}
