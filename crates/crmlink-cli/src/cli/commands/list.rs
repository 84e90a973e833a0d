//! `crmlink list` – walk every page of a list method.

use anyhow::Result;
use crmlink_core::ApiClient;
use serde_json::{json, Value};

use super::params::parse_pairs;

pub fn run_list(
    client: &ApiClient,
    method: &str,
    filters: &[String],
    select: &[String],
    page_size: Option<u32>,
) -> Result<()> {
    let filter = Value::Object(parse_pairs(filters)?);
    let mut pages = client.fetch_all(method, filter);
    if !select.is_empty() {
        pages = pages.with_param("select", json!(select));
    }
    if let Some(size) = page_size {
        pages = pages.with_page_size(size);
    }

    let mut items = Vec::new();
    for item in pages.by_ref() {
        items.push(item?);
    }
    tracing::info!(method, items = items.len(), pages = pages.pages_fetched(), "list completed");
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}
