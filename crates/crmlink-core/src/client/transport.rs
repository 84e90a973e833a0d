//! HTTP transport.
//!
//! Uses the curl crate (libcurl) with one `Easy` handle per request. Runs in
//! the calling thread.

use std::str;
use std::time::Duration;

use super::request::HttpMethod;
use crate::error::{classify_curl_error, ApiError};

/// Fully-resolved HTTP request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// Status, header lines and body of an HTTP reply, before envelope parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Header lines (`Name: value`) of the final response.
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

/// Sends one HTTP request. Transport failures must come back as typed
/// errors, never as an empty success.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse, ApiError>;
}

/// libcurl-backed transport.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    connect_timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

impl CurlTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

fn curl_error(url: &str, e: curl::Error) -> ApiError {
    ApiError::new(classify_curl_error(&e), format!("{url}: {e}")).with_source(e)
}

impl Transport for CurlTransport {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse, ApiError> {
        let url = request.url.as_str();
        let err = |e| curl_error(url, e);
        let mut headers: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(err)?;
        easy.follow_location(true).map_err(err)?;
        easy.max_redirections(5).map_err(err)?;
        easy.connect_timeout(self.connect_timeout).map_err(err)?;
        easy.timeout(request.timeout).map_err(err)?;
        easy.useragent(concat!("crmlink/", env!("CARGO_PKG_VERSION")))
            .map_err(err)?;

        let mut list = curl::easy::List::new();
        list.append("Accept: application/json").map_err(err)?;
        if request.method == HttpMethod::Post {
            list.append("Content-Type: application/json").map_err(err)?;
            easy.post(true).map_err(err)?;
            easy.post_fields_copy(request.body.as_deref().unwrap_or(b"{}"))
                .map_err(err)?;
        }
        easy.http_headers(list).map_err(err)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        let line = s.trim_end();
                        // A new status line starts the headers of a redirected response.
                        if line.starts_with("HTTP/") {
                            headers.clear();
                        } else if !line.is_empty() {
                            headers.push(line.to_string());
                        }
                    }
                    true
                })
                .map_err(err)?;
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(err)?;
            transfer.perform().map_err(err)?;
        }

        let code = easy.response_code().map_err(err)?;
        let status = u16::try_from(code).unwrap_or(0);
        tracing::trace!(url, status, bytes = body.len(), "http response");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
