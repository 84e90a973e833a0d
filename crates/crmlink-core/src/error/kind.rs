//! Failure kinds and their retry semantics.

use std::fmt;

/// High-level classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Server asked us to slow down (HTTP 429, `QUERY_LIMIT_EXCEEDED`).
    RateLimited,
    /// HTTP 5xx or an internal error reported in the body.
    ServerError,
    /// Webhook rejected (401/403, expired or invalid token).
    AuthenticationFailed,
    /// Connection refused, DNS failure, connection reset.
    NetworkUnavailable,
    /// Any other 4xx or an argument error reported in the body.
    BadRequest,
    /// HTTP 404 or a not-found error reported in the body.
    NotFound,
    /// Transport timeout.
    TimedOut,
    /// Unparseable body or an unrecognised failure.
    Unknown,
}

impl ErrorKind {
    /// Whether a later attempt of the same request may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited
                | ErrorKind::ServerError
                | ErrorKind::NetworkUnavailable
                | ErrorKind::TimedOut
        )
    }

    /// Whether the failure affects every request, not just the current item.
    ///
    /// Per-item workflows skip-and-continue on ordinary failures but abort on
    /// systemic ones.
    pub fn is_systemic(self) -> bool {
        matches!(self, ErrorKind::AuthenticationFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::ServerError => "server error",
            ErrorKind::AuthenticationFailed => "authentication failed",
            ErrorKind::NetworkUnavailable => "network unavailable",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::NotFound => "not found",
            ErrorKind::TimedOut => "timed out",
            ErrorKind::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
