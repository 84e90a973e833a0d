//! Error taxonomy for webhook calls.
//!
//! Every failure surfaced by the access layer is an [`ApiError`] carrying an
//! [`ErrorKind`]. The kind decides whether the retry policy may try again and
//! whether a per-item workflow should abort the whole batch.

mod api_error;
mod classify;
mod kind;

pub use api_error::ApiError;
pub use classify::{classify_app_error, classify_curl_error, classify_http_status};
pub use kind::ErrorKind;
