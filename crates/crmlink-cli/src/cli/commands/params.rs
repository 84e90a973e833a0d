//! `key=value` argument parsing shared by `call` and `list`.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

const FILTER_OPERATOR_CHARS: &str = "<>=!%@";

/// Build a JSON object from `key=value` pairs. A value that parses as JSON
/// (numbers, booleans, arrays, objects) is kept as such, anything else is a
/// string. Repeating a key collects its values into an array.
///
/// Keys may start with a filter operator (`>=DATE_CREATE=2024-01-01`); the
/// operator stays part of the key.
pub fn parse_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for pair in pairs {
        let op_len = pair
            .find(|c: char| !FILTER_OPERATOR_CHARS.contains(c))
            .unwrap_or(pair.len());
        let (name, raw) = pair[op_len..]
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got {pair:?}"))?;
        if name.trim().is_empty() {
            return Err(anyhow!("empty key in {pair:?}"));
        }
        let key = format!("{}{}", &pair[..op_len], name.trim());
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        match out.get_mut(&key) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key, value);
            }
        }
    }
    Ok(out)
}
