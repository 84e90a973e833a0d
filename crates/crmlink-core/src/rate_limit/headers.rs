//! Parse rate-limit response headers.

/// Rate-limit related values from a response. Absent or malformed headers
/// are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLimitHeaders {
    /// `Retry-After`, in seconds.
    pub retry_after_secs: Option<f64>,
    /// `X-RateLimit-Remaining`.
    pub remaining: Option<u64>,
    /// `X-RateLimit-Reset`, unix timestamp in seconds.
    pub reset_unix: Option<u64>,
}

impl RateLimitHeaders {
    /// Parse raw header lines (`Name: value`) collected from a response.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut out = Self::default();
        for line in lines {
            let Some((name, value)) = line.as_ref().split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("retry-after") {
                out.retry_after_secs = value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0);
            } else if name.eq_ignore_ascii_case("x-ratelimit-remaining") {
                out.remaining = value.parse().ok();
            } else if name.eq_ignore_ascii_case("x-ratelimit-reset") {
                out.reset_unix = value.parse().ok();
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.retry_after_secs.is_none() && self.remaining.is_none() && self.reset_unix.is_none()
    }
}
