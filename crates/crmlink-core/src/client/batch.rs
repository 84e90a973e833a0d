//! The `batch` endpoint and per-method fallback to single calls.
//!
//! `batch` runs up to 50 commands in one HTTP request:
//! `{"halt": 0, "cmd": {"label": "method?query", ...}}`. The reply nests one
//! result per label under `result.result`, failures under
//! `result.result_error`. Some methods misbehave inside `batch`; those are
//! listed in [`BatchCapabilities`] and called one by one instead.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use super::request::encode_command;
use super::response::envelope_error;
use super::{ApiClient, Response};
use crate::config::BatchConfig;
use crate::error::{classify_app_error, ApiError, ErrorKind};

pub const BATCH_METHOD: &str = "batch";

/// Hard limit on commands per `batch` request.
const MAX_BATCH_COMMANDS: usize = 50;

/// Per-label outcome of a batch (or of its sequential fallback).
pub type BatchResults = BTreeMap<String, Result<Response, ApiError>>;

/// One command inside a batch request.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCommand {
    pub label: String,
    pub endpoint: String,
    pub params: Value,
}

impl BatchCommand {
    pub fn new(label: impl Into<String>, endpoint: impl Into<String>, params: Value) -> Self {
        Self {
            label: label.into(),
            endpoint: endpoint.into(),
            params,
        }
    }
}

/// Which methods may go through `batch`, and how many commands per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCapabilities {
    max_commands: usize,
    unsupported: BTreeSet<String>,
}

impl Default for BatchCapabilities {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}

impl BatchCapabilities {
    pub fn from_config(cfg: &BatchConfig) -> Self {
        Self {
            max_commands: cfg.max_commands.clamp(1, MAX_BATCH_COMMANDS),
            unsupported: cfg.unsupported_methods.iter().cloned().collect(),
        }
    }

    /// Every method batchable.
    pub fn all_supported() -> Self {
        Self {
            max_commands: MAX_BATCH_COMMANDS,
            unsupported: BTreeSet::new(),
        }
    }

    pub fn with_unsupported(mut self, method: impl Into<String>) -> Self {
        self.unsupported.insert(method.into());
        self
    }

    pub fn supports(&self, method: &str) -> bool {
        !self.unsupported.contains(method)
    }

    pub fn max_commands(&self) -> usize {
        self.max_commands
    }
}

impl ApiClient {
    /// Run `commands` through the `batch` endpoint, one request per chunk of
    /// up to `max_commands`. Fails as a whole only if a batch request itself
    /// fails; individual command failures are per-label errors.
    pub fn call_batch(&self, commands: &[BatchCommand]) -> Result<BatchResults, ApiError> {
        let mut results = BatchResults::new();
        for chunk in commands.chunks(self.batch.max_commands()) {
            let cmd: Map<String, Value> = chunk
                .iter()
                .map(|c| (c.label.clone(), Value::String(encode_command(&c.endpoint, &c.params))))
                .collect();
            let response = self.call(BATCH_METHOD, json!({"halt": 0, "cmd": cmd}))?;
            tracing::debug!(commands = chunk.len(), "batch request completed");
            for c in chunk {
                results.insert(c.label.clone(), sub_result(&response, &c.label));
            }
        }
        Ok(results)
    }

    /// Call one method for many parameter sets.
    ///
    /// Uses `batch` when the method supports it, otherwise one call per item.
    /// A systemic failure (authentication) on any item aborts the whole run.
    pub fn fetch_many(
        &self,
        endpoint: &str,
        requests: Vec<(String, Value)>,
    ) -> Result<BatchResults, ApiError> {
        let mut results = if self.batch.supports(endpoint) {
            let commands: Vec<BatchCommand> = requests
                .into_iter()
                .map(|(label, params)| BatchCommand::new(label, endpoint, params))
                .collect();
            self.call_batch(&commands)?
        } else {
            tracing::debug!(endpoint, items = requests.len(), "batch unsupported, calling per item");
            let mut results = BatchResults::new();
            for (label, params) in requests {
                match self.call(endpoint, params) {
                    Err(e) if e.is_systemic() => return Err(e),
                    other => {
                        results.insert(label, other);
                    }
                }
            }
            results
        };

        let systemic = results.iter().find_map(|(label, r)| match r {
            Err(e) if e.is_systemic() => Some(label.clone()),
            _ => None,
        });
        if let Some(Err(e)) = systemic.and_then(|label| results.remove(&label)) {
            tracing::warn!(endpoint, error = %e, "batch aborted");
            return Err(e);
        }
        Ok(results)
    }
}

fn sub_result(batch: &Response, label: &str) -> Result<Response, ApiError> {
    let section = |name: &str| batch.payload.get(name).and_then(|v| v.get(label));

    if let Some(err) = section("result_error") {
        return Err(match envelope_error(err) {
            Some((code, description)) => {
                ApiError::new(classify_app_error(&code), format!("{label}: {code}: {description}"))
            }
            None => ApiError::new(ErrorKind::Unknown, format!("{label}: {err}")),
        });
    }
    let Some(payload) = section("result") else {
        return Err(ApiError::new(
            ErrorKind::Unknown,
            format!("{label}: missing from batch response"),
        ));
    };
    let mut response = Response::new(payload.clone(), batch.status);
    response.total = section("result_total").and_then(Value::as_u64);
    response.next = section("result_next").and_then(Value::as_u64);
    Ok(response)
}
