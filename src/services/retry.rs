use crate::config::SyncConfig;
use crate::error::RemoteError;
use std::time::Duration;

/// What to do with a record after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep it pending, eligible again after the delay.
    RetryAfter(Duration),
    /// Stop trying until someone requeues it.
    Park,
}

/// Bounded exponential backoff for queued uploads.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.backoff_base,
            max_delay: config.backoff_max,
        }
    }

    /// `attempts` counts the attempt that just failed.
    ///
    /// A partial write whose object could not be reclaimed is retried like a
    /// transient error: the next attempt rewrites and reclaims the same key.
    pub fn decide(&self, error: &RemoteError, attempts: u32) -> RetryDecision {
        if !error.needs_retry() || attempts >= self.max_attempts {
            return RetryDecision::Park;
        }
        RetryDecision::RetryAfter(self.delay_for(attempts))
    }

    /// base * 2^(attempts - 1), capped at `max_delay`.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(20);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
