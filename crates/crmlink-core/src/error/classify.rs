//! Classify HTTP status codes, curl errors and body error codes into kinds.

use super::ErrorKind;

/// Classify an HTTP status code.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 => ErrorKind::RateLimited,
        401 | 403 => ErrorKind::AuthenticationFailed,
        404 => ErrorKind::NotFound,
        400..=499 => ErrorKind::BadRequest,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a curl transport error.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::TimedOut;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::NetworkUnavailable;
    }
    ErrorKind::Unknown
}

/// Classify the vendor error code carried in a response body's `error` field.
pub fn classify_app_error(code: &str) -> ErrorKind {
    match code {
        "QUERY_LIMIT_EXCEEDED" | "OPERATION_TIME_LIMIT" => ErrorKind::RateLimited,
        "expired_token" | "invalid_token" | "NO_AUTH_FOUND" | "INVALID_CREDENTIALS"
        | "insufficient_scope" | "ACCESS_DENIED" | "authorization_error" => {
            ErrorKind::AuthenticationFailed
        }
        "NOT_FOUND" | "ERROR_NOT_FOUND" => ErrorKind::NotFound,
        "INTERNAL_SERVER_ERROR" | "ERROR_CORE" => ErrorKind::ServerError,
        "INVALID_REQUEST" | "ERROR_ARGUMENT" | "ERROR_METHOD_NOT_FOUND" | "ERROR_MANIFEST_IS_NOT_AVAILABLE" => {
            ErrorKind::BadRequest
        }
        _ => ErrorKind::Unknown,
    }
}
