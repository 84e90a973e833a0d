//! Client-side request pacing.
//!
//! A [`RateLimiter`] enforces a minimum interval between requests sent by one
//! client and adapts that interval from server feedback (`Retry-After`,
//! `X-RateLimit-Remaining`, `X-RateLimit-Reset`, HTTP 429). It is shared by
//! every thread using the client; one mutex covers the whole
//! check-sleep-record sequence so the interval holds across threads.

mod headers;
mod limiter;

pub use headers::RateLimitHeaders;
pub use limiter::{RateLimiter, RateLimiterStats, DEFAULT_MAX_INTERVAL};
