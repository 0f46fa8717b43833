//! Reusable retry policy for completion-service calls.
//!
//! Every external call site goes through `with_retry` rather than hand-rolling
//! its own backoff loop: bounded attempts, exponential backoff, random jitter,
//! and a caller-supplied retryable-error predicate.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Bounded-attempt retry schedule. Delay for attempt `n` (1-based) is
/// `base_delay * 2^(n-1)` plus up to 25% jitter, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt` (1 = first retry).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << (attempt - 1).min(16))
            .min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=exp.as_millis() as u64 / 4);
        exp + Duration::from_millis(jitter_ms)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is exhausted. The closure receives the 0-based attempt index.
pub async fn with_retry<T, E, F, Fut, P>(policy: &RetryPolicy, retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut last_error: Option<E> = None;

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            warn!(
                "Attempt {}/{} failed, retrying after {}ms...",
                attempt,
                policy.max_attempts,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if retryable(&e) => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    // max_attempts >= 1, so at least one error was recorded.
    Err(last_error.expect("retry loop ran zero attempts"))
}
