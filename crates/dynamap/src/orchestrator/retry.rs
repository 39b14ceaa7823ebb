use std::future::Future;
use std::time::Duration;

use dynamap_core::{AccessError, Result};

use super::backoff::Sleeper;

/// Retry policy for eventually consistent reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    /// Retry while a page comes back empty (ignored when a verify predicate is given).
    pub retry_on_empty: bool,
    /// Retry retryable errors instead of propagating them immediately.
    pub retry_on_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
            retry_on_empty: true,
            retry_on_error: true,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AccessError::validation(
                "retry policy requires at least one attempt",
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(AccessError::validation(format!(
                "retry backoff factor must be >= 1 (got {})",
                self.backoff_factor
            )));
        }
        Ok(())
    }

    /// Delay after `delay`, capped at `max_delay`.
    fn next_delay(&self, delay: Duration) -> Duration {
        let next = (delay.as_secs_f64() * self.backoff_factor).min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(next).unwrap_or(self.max_delay)
    }
}

/// Runs `attempt` until `satisfied` accepts its output or the policy runs out.
///
/// When every attempt produced an unsatisfying output, the last one is
/// returned. Validation errors are never retried.
pub async fn retry_until<O, F, Fut, S>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt: F,
    satisfied: S,
) -> Result<O>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<O>>,
    S: Fn(&O) -> bool,
{
    policy.validate()?;

    let mut delay = policy.initial_delay;
    let mut last = None;
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Ok(output) if satisfied(&output) => return Ok(output),
            Ok(output) => {
                tracing::debug!(attempt = n, "read not yet satisfied");
                last = Some(output);
            }
            Err(err) if !err.is_retryable() || !policy.retry_on_error => return Err(err),
            Err(err) if n == policy.max_attempts => return Err(err),
            Err(err) => {
                tracing::warn!(attempt = n, error = %err, "read failed, retrying");
            }
        }

        if n < policy.max_attempts {
            sleeper.sleep(delay).await;
            delay = policy.next_delay(delay);
        }
    }

    last.ok_or_else(|| AccessError::validation("retry finished without a result"))
}
