//! Response envelope parsing.
//!
//! Every webhook reply has the shape
//! `{"result": ..., "total": n, "next": n, "error": "...", "error_description": "..."}`.
//! An `error` field is a failure whatever the HTTP status says.

use serde_json::Value;

use super::transport::RawResponse;
use crate::error::{classify_app_error, classify_http_status, ApiError, ErrorKind};

/// Keys under which list methods nest their rows inside `result`.
const ITEM_KEYS: [&str; 2] = ["items", "productRows"];

/// A successful, parsed webhook reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The unwrapped `result` field (`Null` when absent).
    pub payload: Value,
    pub status: u16,
    pub succeeded: bool,
    pub error_message: Option<String>,
    /// `total` from the envelope, for list methods.
    pub total: Option<u64>,
    /// `next` from the envelope: the start offset of the following page.
    pub next: Option<u64>,
}

impl Response {
    pub fn new(payload: Value, status: u16) -> Self {
        Self {
            payload,
            status,
            succeeded: true,
            error_message: None,
            total: None,
            next: None,
        }
    }

    /// Rows of a list reply: the payload itself when it is an array,
    /// otherwise its `items`/`productRows` array.
    pub fn items(&self) -> &[Value] {
        items_of(&self.payload)
    }

    pub fn into_items(self) -> Vec<Value> {
        match self.payload {
            Value::Array(items) => items,
            Value::Object(mut map) => ITEM_KEYS
                .iter()
                .find_map(|k| match map.remove(*k) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// True when the call legitimately returned nothing: `null`, `false`,
    /// an empty array/object, or an object whose row list is empty.
    pub fn is_empty_payload(&self) -> bool {
        match &self.payload {
            Value::Null | Value::Bool(false) => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => {
                map.is_empty()
                    || ITEM_KEYS.iter().any(|k| {
                        matches!(map.get(*k), Some(Value::Array(items)) if items.is_empty())
                    })
            }
            _ => false,
        }
    }
}

pub(crate) fn items_of(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items,
        Value::Object(map) => ITEM_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Message from the envelope's `error_description`/`error` fields.
pub(crate) fn envelope_error(body: &Value) -> Option<(String, String)> {
    let code = match body.get("error")? {
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    let description = body
        .get("error_description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| code.clone());
    Some((code, description))
}

/// Turn a raw HTTP reply into a [`Response`] or a typed error.
pub(crate) fn parse_response(endpoint: &str, raw: &RawResponse) -> Result<Response, ApiError> {
    let parsed: Result<Value, serde_json::Error> = serde_json::from_slice(&raw.body);

    if !(200..300).contains(&raw.status) {
        let kind = classify_http_status(raw.status);
        let detail = parsed
            .as_ref()
            .ok()
            .and_then(envelope_error)
            .map(|(_, description)| description)
            .unwrap_or_else(|| format!("HTTP {}", raw.status));
        return Err(ApiError::http(kind, raw.status, format!("{endpoint}: {detail}")));
    }

    let body = parsed.map_err(|e| {
        ApiError::new(
            ErrorKind::Unknown,
            format!("{endpoint}: response is not valid JSON"),
        )
        .with_source(e)
    })?;
    if !body.is_object() {
        return Err(ApiError::new(
            ErrorKind::Unknown,
            format!("{endpoint}: response is not a JSON object"),
        ));
    }

    if let Some((code, description)) = envelope_error(&body) {
        return Err(ApiError::new(
            classify_app_error(&code),
            format!("{endpoint}: {code}: {description}"),
        ));
    }

    Ok(Response {
        payload: body.get("result").cloned().unwrap_or(Value::Null),
        status: raw.status,
        succeeded: true,
        error_message: None,
        total: body.get("total").and_then(Value::as_u64),
        next: body.get("next").and_then(Value::as_u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn unwraps_result_and_pagination() {
        let r = parse_response(
            "crm.item.list",
            &raw(200, r#"{"result":{"items":[{"id":1},{"id":2}]},"total":3,"next":2}"#),
        )
        .unwrap();
        assert_eq!(r.items().len(), 2);
        assert_eq!(r.total, Some(3));
        assert_eq!(r.next, Some(2));
        assert!(r.succeeded);
    }

    #[test]
    fn array_result_is_items() {
        let r = parse_response("crm.deal.list", &raw(200, r#"{"result":[{"ID":"1"}],"total":1}"#)).unwrap();
        assert_eq!(r.items(), &[json!({"ID": "1"})]);
        assert_eq!(r.next, None);
        assert_eq!(r.into_items().len(), 1);
    }

    #[test]
    fn body_error_raises_even_on_200() {
        let err = parse_response(
            "crm.deal.get",
            &raw(200, r#"{"error":"NOT_FOUND","error_description":"Not found"}"#),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), None);
        assert!(err.message().contains("Not found"));
    }

    #[test]
    fn http_status_wins_and_uses_body_description() {
        let err = parse_response(
            "crm.deal.get",
            &raw(401, r#"{"error":"expired_token","error_description":"The access token provided has expired."}"#),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(err.status(), Some(401));
        assert!(err.message().contains("has expired"));
    }

    #[test]
    fn non_json_error_body() {
        let err = parse_response("x", &raw(502, "<html>Bad Gateway</html>")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.message(), "x: HTTP 502");
    }

    #[test]
    fn invalid_json_is_unknown_and_not_retryable() {
        let err = parse_response("x", &raw(200, "not json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(!err.is_retryable());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn query_limit_in_body_is_rate_limited() {
        let err = parse_response(
            "x",
            &raw(200, r#"{"error":"QUERY_LIMIT_EXCEEDED","error_description":"Too many requests"}"#),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.is_retryable());
    }

    #[test]
    fn empty_payload_detection() {
        assert!(Response::new(Value::Null, 200).is_empty_payload());
        assert!(Response::new(json!([]), 200).is_empty_payload());
        assert!(Response::new(json!({"productRows": []}), 200).is_empty_payload());
        assert!(!Response::new(json!({"ID": "5"}), 200).is_empty_payload());
        assert!(!Response::new(json!([1]), 200).is_empty_payload());
    }
}
