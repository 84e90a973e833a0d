//! `crmlink call` – call one method and print its result.

use anyhow::Result;
use crmlink_core::{ApiClient, Request};
use serde_json::{json, Value};

use super::params::parse_pairs;

pub fn run_call(client: &ApiClient, method: &str, params: &[String], get: bool) -> Result<()> {
    let params = Value::Object(parse_pairs(params)?);
    let request = if get {
        Request::get(method, params)
    } else {
        Request::post(method, params)
    };
    let response = client.execute(&request)?;
    tracing::info!(method, total = response.total, "call completed");

    let mut out = json!({ "result": response.payload });
    if let Some(total) = response.total {
        out["total"] = json!(total);
    }
    if let Some(next) = response.next {
        out["next"] = json!(next);
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
