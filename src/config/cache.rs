//! Read cache and retry configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Profile and subscription read cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long a cached read stays fresh, in seconds
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Retries after the first failed read
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled on each further retry
    #[serde(default = "default_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Upper bound for any single retry delay
    #[serde(default = "default_max_delay")]
    pub retry_max_delay_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ttl_secs == 0 {
            return Err(ValidationError::InvalidCacheTtl);
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(ValidationError::InvalidRetryDelays);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_base_delay(),
            retry_max_delay_ms: default_max_delay(),
        }
    }
}

fn default_ttl() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    10_000
}
