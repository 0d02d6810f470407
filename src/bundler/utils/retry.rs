//! Bounded retry with exponential backoff for flaky external tools.

use crate::bundler::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// How many times to try and how long to wait in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Wait after the first failure
    pub initial_delay: Duration,
    /// Multiplier applied to the wait after each further failure
    pub factor: u32,
}

impl RetryPolicy {
    /// Three attempts, waiting 15 s then 30 s.
    pub const EXTERNAL_TOOL: RetryPolicy = RetryPolicy {
        attempts: 3,
        initial_delay: Duration::from_secs(15),
        factor: 2,
    };

    /// Delay before attempt `n + 1`, where `n` counts from zero.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.initial_delay * self.factor.saturating_pow(failed_attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::EXTERNAL_TOOL
    }
}

/// Runs `op` until it succeeds or `policy.attempts` is exhausted.
///
/// The final failure is wrapped in [`Error::RetriesExhausted`].
pub async fn retry<T, F, Fut>(operation: &str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts => {
                let wait = policy.delay_after(attempt);
                log::warn!(
                    "{operation} failed ({e}), waiting {} seconds before retrying",
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                log::error!("Maximum {operation} attempts exceeded; giving up");
                return Err(Error::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts,
                    last: Box::new(e),
                });
            }
        }
    }
}
