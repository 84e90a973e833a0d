//! Webhook API client.
//!
//! [`ApiClient`] is the boundary the rest of an application talks to. Each
//! call builds a [`Request`], waits on the shared [`RateLimiter`], sends the
//! HTTP request through a [`Transport`], feeds the reply headers back into the
//! limiter and turns the reply into a [`Response`] or a typed [`ApiError`].
//! Retries, pagination, the batch endpoint and cached lookups are layered on
//! top of that single-attempt path.
//!
//! The client is `Send + Sync`; worker threads share one instance by
//! reference so that they share its limiter and cache.

mod batch;
mod lookup;
mod pages;
mod request;
mod response;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::cache::ResponseCache;
use crate::config::CrmlinkConfig;
use crate::error::{ApiError, ErrorKind};
use crate::rate_limit::RateLimiter;
use crate::retry::{run_with_retry, RetryPolicy};

pub use batch::{BatchCapabilities, BatchCommand, BatchResults, BATCH_METHOD};
pub use lookup::{product_rows_params, ItemsOutcome};
pub use pages::{Pages, PAGE_SIZE_PARAM};
pub use request::{encode_query, HttpMethod, Request};
pub use response::Response;
pub use transport::{CurlTransport, HttpRequest, RawResponse, Transport};

/// Runtime settings for an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub webhook_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_requests_per_second: f64,
    pub max_interval: Duration,
    /// `None` sends every request exactly once.
    pub retry: Option<RetryPolicy>,
    /// `None` disables the response cache.
    pub cache_ttl: Option<Duration>,
    pub batch: BatchCapabilities,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
            max_requests_per_second: 2.0,
            max_interval: crate::rate_limit::DEFAULT_MAX_INTERVAL,
            retry: Some(RetryPolicy::default()),
            cache_ttl: Some(crate::cache::DEFAULT_TTL),
            batch: BatchCapabilities::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_config(cfg: &CrmlinkConfig) -> Self {
        let cache = cfg.cache.clone().unwrap_or_default();
        Self {
            webhook_url: cfg.webhook_url.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            max_requests_per_second: cfg.max_requests_per_second,
            max_interval: Duration::try_from_secs_f64(cfg.max_interval_secs.max(0.0))
                .unwrap_or(crate::rate_limit::DEFAULT_MAX_INTERVAL),
            retry: Some(RetryPolicy::from_config(&cfg.retry.clone().unwrap_or_default())),
            cache_ttl: cache.enabled.then(|| Duration::from_secs(cache.ttl_secs)),
            batch: BatchCapabilities::from_config(&cfg.batch.clone().unwrap_or_default()),
        }
    }
}

/// Rate-limited, retrying, caching client for one webhook.
pub struct ApiClient {
    base: Url,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: Option<Arc<ResponseCache>>,
    retry: Option<RetryPolicy>,
    batch: BatchCapabilities,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook path embeds its secret token; only show the host.
        f.debug_struct("ApiClient")
            .field("host", &self.base.host_str())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Client using the curl transport.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = Arc::new(CurlTransport::new(config.connect_timeout));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        let base = Url::parse(config.webhook_url.trim()).map_err(|e| {
            ApiError::new(ErrorKind::BadRequest, "invalid webhook URL").with_source(e)
        })?;
        let limiter = Arc::new(RateLimiter::with_max_interval(
            config.max_requests_per_second,
            config.max_interval,
        ));
        let cache = config.cache_ttl.map(|ttl| Arc::new(ResponseCache::new(ttl)));
        tracing::debug!(
            host = base.host_str().unwrap_or(""),
            rps = config.max_requests_per_second,
            cache = cache.is_some(),
            "webhook client created"
        );
        Ok(Self {
            base,
            timeout: config.timeout,
            transport,
            limiter,
            cache,
            retry: config.retry,
            batch: config.batch,
        })
    }

    /// Share an existing limiter (e.g. several clients on one webhook quota).
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Use an injected cache instead of the client's own.
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    pub fn batch_capabilities(&self) -> &BatchCapabilities {
        &self.batch
    }

    /// Call `endpoint` with `params` as a POST, retrying per the client's policy.
    pub fn call(&self, endpoint: &str, params: Value) -> Result<Response, ApiError> {
        self.execute(&Request::post(endpoint, params))
    }

    /// Send `request`, retrying per the client's policy.
    pub fn execute(&self, request: &Request) -> Result<Response, ApiError> {
        match &self.retry {
            Some(policy) => run_with_retry(policy, || self.call_once(request)),
            None => self.call_once(request),
        }
    }

    /// Send `request` exactly once.
    pub fn call_once(&self, request: &Request) -> Result<Response, ApiError> {
        let url = request.url(&self.base)?;
        let waited = self.limiter.acquire();
        tracing::debug!(
            endpoint = request.endpoint(),
            waited_ms = waited.as_millis() as u64,
            "sending request"
        );

        let raw = self.transport.send(&HttpRequest {
            method: request.http_method(),
            url: url.into(),
            body: request.body(),
            timeout: self.timeout,
        })?;
        self.limiter.update_from_response(&raw.headers, raw.status);
        response::parse_response(request.endpoint(), &raw)
    }
}

#[cfg(test)]
pub(crate) mod test_support;
