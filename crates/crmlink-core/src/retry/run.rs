//! Retry loop: run a closure until success or policy says stop.

use std::time::Duration;

use super::policy::{RetryDecision, RetryPolicy};
use crate::error::ApiError;

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
/// The error from the final attempt is returned unchanged.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, f: F) -> Result<T, ApiError>
where
    F: FnMut() -> Result<T, ApiError>,
{
    run_with_retry_and_sleep(policy, std::thread::sleep, f)
}

/// Same as [`run_with_retry`] with an explicit sleep function.
pub fn run_with_retry_and_sleep<T, F, S>(
    policy: &RetryPolicy,
    mut sleep: S,
    mut f: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Result<T, ApiError>,
    S: FnMut(Duration),
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, &e) {
                RetryDecision::NoRetry => {
                    if attempt > 1 {
                        tracing::warn!(attempt, error = %e, "giving up after retries");
                    }
                    return Err(e);
                }
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(attempt, delay_ms = d.as_millis() as u64, error = %e, "retrying");
                    sleep(d);
                    attempt += 1;
                }
            },
        }
    }
}
