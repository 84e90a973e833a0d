//! Cache-aware lookups for high-repetition queries.
//!
//! These answer questions like "which product rows does invoice N have",
//! which a report asks many times over. An empty answer is cached like any
//! other, so a second ask costs no request; a failed lookup is reported as
//! failed and never cached.

use std::collections::{BTreeMap, BTreeSet};
use std::thread;

use serde_json::{json, Value};

use super::response::items_of;
use super::{ApiClient, Response};
use crate::config::PRODUCT_ROWS_METHOD;
use crate::error::{ApiError, ErrorKind};

/// Owner type code of smart invoices in product-row filters.
const INVOICE_OWNER_TYPE: &str = "SI";

/// Result of a per-item list lookup that keeps "empty" and "failed" apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemsOutcome {
    pub items: Vec<Value>,
    pub failed: bool,
    pub error_message: Option<String>,
}

impl ItemsOutcome {
    pub fn found(items: Vec<Value>) -> Self {
        Self {
            items,
            failed: false,
            error_message: None,
        }
    }

    pub fn failure(err: &ApiError) -> Self {
        Self {
            items: Vec::new(),
            failed: true,
            error_message: Some(err.to_string()),
        }
    }

    fn from_cached(value: Option<Value>) -> Self {
        Self::found(value.as_ref().map(|v| items_of(v).to_vec()).unwrap_or_default())
    }

    /// Succeeded with no rows.
    pub fn is_empty(&self) -> bool {
        !self.failed && self.items.is_empty()
    }
}

/// Parameters selecting the product rows of one invoice.
pub fn product_rows_params(invoice_id: u64) -> Value {
    json!({
        "filter": {
            "=ownerType": INVOICE_OWNER_TYPE,
            "=ownerId": invoice_id,
        }
    })
}

fn cacheable(response: &Response) -> Option<Value> {
    if response.is_empty_payload() {
        None
    } else {
        Some(response.payload.clone())
    }
}

impl ApiClient {
    /// Call `endpoint` through the response cache.
    ///
    /// `Ok(None)` means the method answered with nothing; that answer is
    /// cached too. Errors are returned and not cached.
    pub fn cached_call(&self, endpoint: &str, params: Value) -> Result<Option<Value>, ApiError> {
        let Some(cache) = self.cache() else {
            return Ok(cacheable(&self.call(endpoint, params)?));
        };
        if let Some(hit) = cache.get(endpoint, &params) {
            return Ok(hit);
        }
        let response = self.call(endpoint, params.clone())?;
        let value = cacheable(&response);
        cache.put(endpoint, &params, value.clone());
        Ok(value)
    }

    /// Product rows of one invoice.
    ///
    /// Ordinary failures come back as a failed [`ItemsOutcome`]; systemic
    /// ones (authentication) as `Err`, since every later lookup would fail too.
    pub fn products_for_invoice(&self, invoice_id: u64) -> Result<ItemsOutcome, ApiError> {
        match self.cached_call(PRODUCT_ROWS_METHOD, product_rows_params(invoice_id)) {
            Ok(value) => Ok(ItemsOutcome::from_cached(value)),
            Err(e) if e.is_systemic() => Err(e),
            Err(e) => {
                tracing::warn!(invoice_id, error = %e, "product lookup failed");
                Ok(ItemsOutcome::failure(&e))
            }
        }
    }

    /// Product rows of many invoices, keyed by invoice id.
    ///
    /// Cached invoices cost nothing; the rest go through [`ApiClient::fetch_many`],
    /// which batches them unless the product-row method is flagged as not
    /// batchable.
    pub fn products_for_invoices(
        &self,
        invoice_ids: &[u64],
    ) -> Result<BTreeMap<u64, ItemsOutcome>, ApiError> {
        let ids: BTreeSet<u64> = invoice_ids.iter().copied().collect();
        let mut out = BTreeMap::new();
        let mut pending = Vec::new();

        for id in ids {
            let params = product_rows_params(id);
            match self.cache().and_then(|c| c.get(PRODUCT_ROWS_METHOD, &params)) {
                Some(hit) => {
                    out.insert(id, ItemsOutcome::from_cached(hit));
                }
                None => pending.push((id.to_string(), params)),
            }
        }
        if pending.is_empty() {
            return Ok(out);
        }

        let params_by_label: BTreeMap<String, Value> = pending.iter().cloned().collect();
        let results = match self.fetch_many(PRODUCT_ROWS_METHOD, pending) {
            Ok(results) => results,
            Err(e) if e.is_systemic() => return Err(e),
            Err(e) => {
                tracing::warn!(invoices = params_by_label.len(), error = %e, "product batch failed");
                for label in params_by_label.keys() {
                    if let Ok(id) = label.parse::<u64>() {
                        out.insert(id, ItemsOutcome::failure(&e));
                    }
                }
                return Ok(out);
            }
        };
        for (label, result) in results {
            let Ok(id) = label.parse::<u64>() else {
                continue;
            };
            let outcome = match result {
                Ok(response) => {
                    let value = cacheable(&response);
                    if let (Some(cache), Some(params)) = (self.cache(), params_by_label.get(&label)) {
                        cache.put(PRODUCT_ROWS_METHOD, params, value.clone());
                    }
                    ItemsOutcome::from_cached(value)
                }
                Err(e) => {
                    tracing::warn!(invoice_id = id, error = %e, "product lookup failed");
                    ItemsOutcome::failure(&e)
                }
            };
            out.insert(id, outcome);
        }
        Ok(out)
    }

    /// Like [`ApiClient::products_for_invoices`] with one call per invoice,
    /// spread over `workers` threads sharing this client's limiter and cache.
    pub fn products_for_invoices_concurrent(
        &self,
        invoice_ids: &[u64],
        workers: usize,
    ) -> Result<BTreeMap<u64, ItemsOutcome>, ApiError> {
        let ids: Vec<u64> = invoice_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let workers = workers.clamp(1, ids.len());
        let chunk_size = ids.len().div_ceil(workers);

        let per_worker: Vec<Result<Vec<(u64, ItemsOutcome)>, ApiError>> = thread::scope(|s| {
            let handles: Vec<_> = ids
                .chunks(chunk_size)
                .map(|chunk| {
                    s.spawn(move || {
                        chunk
                            .iter()
                            .map(|&id| self.products_for_invoice(id).map(|o| (id, o)))
                            .collect::<Result<Vec<_>, ApiError>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(ApiError::new(ErrorKind::Unknown, "lookup worker panicked"))
                    })
                })
                .collect()
        });

        let mut out = BTreeMap::new();
        for chunk in per_worker {
            out.extend(chunk?);
        }
        Ok(out)
    }
}
