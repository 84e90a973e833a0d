use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::ApiError;

/// Status codes retried when the config does not list its own.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with caps.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every further attempt.
    pub backoff_factor: Duration,
    /// Upper bound on a single backoff delay.
    pub max_delay: Duration,
    /// HTTP statuses that may be retried. An error carrying any other status
    /// is returned immediately.
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        let codes = match &cfg.retryable_status_codes {
            Some(codes) => codes.iter().copied().collect(),
            None => DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        };
        Self {
            max_attempts: cfg.max_attempts.max(1),
            backoff_factor: Duration::try_from_secs_f64(cfg.backoff_secs.max(0.0))
                .unwrap_or(Self::default().backoff_factor),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
            retryable_status_codes: codes,
        }
    }

    /// Decide what to do after `attempt` failed with `err`.
    ///
    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, err: &ApiError) -> RetryDecision {
        if let Some(status) = err.status() {
            if !self.retryable_status_codes.contains(&status) {
                return RetryDecision::NoRetry;
            }
        }
        if !err.is_retryable() {
            return RetryDecision::NoRetry;
        }
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff_for(attempt))
    }

    /// Backoff after the given failed attempt: factor * 2^(attempt-1), capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_factor.saturating_mul(exp).min(self.max_delay)
    }
}
