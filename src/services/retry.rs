use std::time::Duration;

/// Exponential backoff: the delay after failed attempt `n` (1-based) is
/// `initial_delay * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `attempt` failed, or `None` when no attempt follows.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u32.checked_pow(attempt - 1)?;
        self.initial_delay.checked_mul(factor)
    }
}

/// Source of waiting between attempts, swapped out in tests.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
