//! Exponential backoff for infrastructure reads.
//!
//! The delay before retry `n` (1-based) is `base * 2^(n-1)`, capped at
//! `max_delay`. Only errors whose code is transient are retried.

use std::future::Future;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::domain::foundation::DomainError;

/// Retry schedule for repository reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }

    /// A policy that fails on the first error.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before the given retry attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Runs `operation`, retrying transient failures on the schedule.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.code.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
