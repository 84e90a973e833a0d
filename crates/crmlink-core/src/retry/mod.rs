//! Retry and backoff policy.
//!
//! Wraps a fallible webhook call with bounded exponential backoff. The
//! decision to retry is driven by the error taxonomy in [`crate::error`] plus
//! the configured set of retryable HTTP status codes.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy, DEFAULT_RETRYABLE_STATUS_CODES};
pub use run::{run_with_retry, run_with_retry_and_sleep};
