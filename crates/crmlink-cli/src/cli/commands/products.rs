//! `crmlink products` – product rows per invoice.

use std::collections::BTreeMap;

use anyhow::Result;
use crmlink_core::{ApiClient, ItemsOutcome};
use serde_json::{json, Map, Value};

pub fn run_products(client: &ApiClient, ids: &[u64], workers: usize) -> Result<()> {
    let outcomes = if workers > 1 {
        client.products_for_invoices_concurrent(ids, workers)?
    } else {
        client.products_for_invoices(ids)?
    };
    let failed = outcomes.values().filter(|o| o.failed).count();
    tracing::info!(invoices = outcomes.len(), failed, "product lookup completed");
    println!("{}", serde_json::to_string_pretty(&render(&outcomes))?);
    Ok(())
}

fn render(outcomes: &BTreeMap<u64, ItemsOutcome>) -> Value {
    let map: Map<String, Value> = outcomes
        .iter()
        .map(|(id, o)| {
            let entry = if o.failed {
                json!({ "failed": true, "error": o.error_message })
            } else {
                json!({ "items": o.items })
            };
            (id.to_string(), entry)
        })
        .collect();
    Value::Object(map)
}
