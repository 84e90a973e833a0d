//! Adaptive minimum-interval limiter.

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::RateLimitHeaders;

/// Upper bound for the interval after repeated 429s without `Retry-After`.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(2);

/// Growth factor applied to the interval on a 429 without `Retry-After`.
const THROTTLE_GROWTH: f64 = 1.5;

/// Far-future deadlines from bogus headers are clamped to this.
const MAX_DEADLINE: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct LimiterState {
    current_interval: Duration,
    last_request: Option<Instant>,
    retry_after_deadline: Option<Instant>,
    request_count: u64,
}

/// Point-in-time view of the limiter, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterStats {
    pub request_count: u64,
    pub min_interval: Duration,
    pub current_interval: Duration,
    /// Time left until a server-imposed pause ends, if one is pending.
    pub retry_after: Option<Duration>,
}

/// Enforces a minimum interval between requests and adapts it from responses.
///
/// `acquire` holds the lock while it sleeps, so any two gated requests are at
/// least `current_interval` apart. Which waiting thread goes next is
/// unspecified.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    max_interval: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Limiter allowing at most `max_requests_per_second`.
    pub fn new(max_requests_per_second: f64) -> Self {
        Self::with_max_interval(max_requests_per_second, DEFAULT_MAX_INTERVAL)
    }

    pub fn with_max_interval(max_requests_per_second: f64, max_interval: Duration) -> Self {
        let rps = if max_requests_per_second.is_finite() && max_requests_per_second > 0.0 {
            max_requests_per_second
        } else {
            tracing::warn!(
                max_requests_per_second,
                "invalid request rate, falling back to 2 req/s"
            );
            2.0
        };
        let min_interval =
            Duration::try_from_secs_f64(1.0 / rps).unwrap_or(Duration::from_millis(500));
        Self {
            min_interval,
            max_interval: max_interval.max(min_interval),
            state: Mutex::new(LimiterState {
                current_interval: min_interval,
                last_request: None,
                retry_after_deadline: None,
                request_count: 0,
            }),
        }
    }

    // A panic elsewhere while holding the lock leaves plain timestamps behind,
    // which are still usable.
    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until a request may be sent, then record it.
    ///
    /// Returns the time spent sleeping (not counting lock contention).
    pub fn acquire(&self) -> Duration {
        let mut state = self.lock();
        let mut waited = Duration::ZERO;

        if let Some(deadline) = state.retry_after_deadline.take() {
            let now = Instant::now();
            if deadline > now {
                let pause = deadline - now;
                tracing::debug!(pause_ms = pause.as_millis() as u64, "waiting for server retry window");
                thread::sleep(pause);
                waited += pause;
            }
        }

        if let Some(last) = state.last_request {
            let elapsed = last.elapsed();
            if elapsed < state.current_interval {
                let pause = state.current_interval - elapsed;
                thread::sleep(pause);
                waited += pause;
            }
        }

        state.last_request = Some(Instant::now());
        state.request_count += 1;
        waited
    }

    /// Adjust pacing from a response's header lines and status code.
    pub fn update_from_response<S: AsRef<str>>(&self, header_lines: &[S], status: u16) {
        self.apply(&RateLimitHeaders::parse(header_lines), status);
    }

    /// Adjust pacing from already-parsed headers.
    pub fn apply(&self, headers: &RateLimitHeaders, status: u16) {
        let mut state = self.lock();
        let now = Instant::now();

        if status == 429 || (status == 503 && headers.retry_after_secs.is_some()) {
            let pause = match headers.retry_after_secs {
                Some(secs) => clamp_deadline(secs),
                None => {
                    let pause = state.current_interval.saturating_mul(2).min(MAX_DEADLINE);
                    state.current_interval =
                        Duration::try_from_secs_f64(state.current_interval.as_secs_f64() * THROTTLE_GROWTH)
                            .unwrap_or(self.max_interval)
                            .min(self.max_interval);
                    pause
                }
            };
            let deadline = now + pause;
            state.retry_after_deadline = Some(match state.retry_after_deadline {
                Some(existing) if existing > deadline => existing,
                _ => deadline,
            });
            tracing::warn!(
                status,
                pause_ms = pause.as_millis() as u64,
                interval_ms = state.current_interval.as_millis() as u64,
                "server throttled request"
            );
            return;
        }

        if !(200..300).contains(&status) {
            return;
        }
        let (Some(remaining), Some(reset_unix)) = (headers.remaining, headers.reset_unix) else {
            return;
        };
        let until_reset = secs_until_unix(reset_unix);
        if remaining == 0 {
            state.retry_after_deadline = Some(now + until_reset);
            tracing::debug!(
                reset_in_ms = until_reset.as_millis() as u64,
                "request budget exhausted, pausing until reset"
            );
        } else {
            let spread = until_reset / u32::try_from(remaining).unwrap_or(u32::MAX);
            state.current_interval = spread.max(self.min_interval);
            tracing::debug!(
                remaining,
                interval_ms = state.current_interval.as_millis() as u64,
                "spreading remaining budget"
            );
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn stats(&self) -> RateLimiterStats {
        let state = self.lock();
        let now = Instant::now();
        RateLimiterStats {
            request_count: state.request_count,
            min_interval: self.min_interval,
            current_interval: state.current_interval,
            retry_after: state
                .retry_after_deadline
                .filter(|d| *d > now)
                .map(|d| d - now),
        }
    }
}

/// Server-supplied pause in seconds, capped at [`MAX_DEADLINE`] before the
/// conversion so huge values cannot overflow `Duration`.
fn clamp_deadline(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.min(MAX_DEADLINE.as_secs_f64())).unwrap_or(Duration::ZERO)
}

/// Time from now until the given unix timestamp; zero if it is in the past.
fn secs_until_unix(reset_unix: u64) -> Duration {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Duration::from_secs(reset_unix)
        .saturating_sub(now)
        .min(MAX_DEADLINE)
}
