//! Scripted transport for client unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ApiClient, ClientConfig, HttpRequest, RawResponse, Transport};
use crate::error::ApiError;
use crate::retry::RetryPolicy;

/// Replays queued replies in order and records every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<RawResponse, ApiError>>>,
    pub(crate) requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply(&self, status: u16, headers: &[&str], body: &str) {
        self.replies.lock().unwrap().push_back(Ok(RawResponse {
            status,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            body: body.as_bytes().to_vec(),
        }));
    }

    pub(crate) fn fail(&self, err: ApiError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.url.clone()).collect()
    }

    pub(crate) fn bodies(&self) -> Vec<serde_json::Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| serde_json::from_slice(r.body.as_deref().unwrap_or(b"null")).unwrap())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}

/// Fast settings: high request rate, millisecond backoff.
pub(crate) fn fast_config() -> ClientConfig {
    ClientConfig {
        webhook_url: "https://crm.example.com/rest/1/secret/".to_string(),
        max_requests_per_second: 1000.0,
        retry: Some(RetryPolicy {
            backoff_factor: Duration::from_millis(1),
            ..RetryPolicy::default()
        }),
        ..ClientConfig::default()
    }
}

pub(crate) fn client_with(config: ClientConfig, transport: &Arc<ScriptedTransport>) -> ApiClient {
    ApiClient::with_transport(config, Arc::clone(transport) as Arc<dyn Transport>).unwrap()
}
