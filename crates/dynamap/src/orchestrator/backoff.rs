use std::time::Duration;

use async_trait::async_trait;

pub const BATCH_BASE_DELAY: Duration = Duration::from_millis(50);
pub const BATCH_MAX_DELAY: Duration = Duration::from_secs(1);

/// Injected sleep used by every retry loop.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Delay before batch retry `attempt` (1-based): `min(1s, 50ms * 2^(attempt-1))`.
pub fn batch_retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    BATCH_BASE_DELAY
        .saturating_mul(1u32 << exponent)
        .min(BATCH_MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_retry_delay_doubles_then_caps() {
        assert_eq!(batch_retry_delay(1), Duration::from_millis(50));
        assert_eq!(batch_retry_delay(2), Duration::from_millis(100));
        assert_eq!(batch_retry_delay(5), Duration::from_millis(800));
        assert_eq!(batch_retry_delay(6), Duration::from_secs(1));
        assert_eq!(batch_retry_delay(60), Duration::from_secs(1));
    }

    #[test]
    fn test_attempt_zero_uses_base_delay() {
        assert_eq!(batch_retry_delay(0), BATCH_BASE_DELAY);
    }
}
