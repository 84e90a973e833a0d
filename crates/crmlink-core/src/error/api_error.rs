//! The error type returned by every webhook call.

use super::ErrorKind;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failed webhook call: kind, human-readable message, HTTP status when one
/// was received, and the lower-level cause when there is one.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Error for a non-2xx HTTP status.
    pub fn http(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self::new(kind, message).with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_systemic(&self) -> bool {
        self.kind.is_systemic()
    }
}
