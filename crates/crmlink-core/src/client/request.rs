//! Outgoing request description and URL/query encoding.

use serde_json::Value;
use url::Url;

use crate::error::{ApiError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One webhook call: HTTP method, REST method name and parameters.
///
/// GET requests carry the parameters in the query string, POST requests as a
/// JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: HttpMethod,
    endpoint: String,
    params: Value,
}

impl Request {
    pub fn get(endpoint: impl Into<String>, params: Value) -> Self {
        Self {
            method: HttpMethod::Get,
            endpoint: endpoint.into(),
            params,
        }
    }

    pub fn post(endpoint: impl Into<String>, params: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            endpoint: endpoint.into(),
            params,
        }
    }

    pub fn http_method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    /// `{base}/{endpoint}`, plus the encoded query for GET.
    pub fn url(&self, base: &Url) -> Result<Url, ApiError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::new(
                    ErrorKind::BadRequest,
                    format!("webhook URL cannot carry a path: {base}"),
                )
            })?
            .pop_if_empty()
            .push(&self.endpoint);
        if self.method == HttpMethod::Get {
            let pairs = encode_query(&self.params);
            if !pairs.is_empty() {
                url.query_pairs_mut()
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
        }
        Ok(url)
    }

    /// JSON body for POST requests.
    pub fn body(&self) -> Option<Vec<u8>> {
        match self.method {
            HttpMethod::Get => None,
            HttpMethod::Post => Some(self.params.to_string().into_bytes()),
        }
    }
}

/// Flatten an object of parameters into query pairs using bracketed keys:
/// `{"filter": {"status": "active"}, "select": ["id"]}` becomes
/// `filter[status]=active`, `select[0]=id`.
pub fn encode_query(params: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Value::Object(map) = params {
        for (k, v) in map {
            flatten(k.clone(), v, &mut out);
        }
    }
    out
}

fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten(format!("{prefix}[{k}]"), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(format!("{prefix}[{i}]"), v, out);
            }
        }
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Null => out.push((prefix, String::new())),
        other => out.push((prefix, other.to_string())),
    }
}

/// `endpoint?query` form used inside a batch `cmd` map.
pub(crate) fn encode_command(endpoint: &str, params: &Value) -> String {
    let pairs = encode_query(params);
    if pairs.is_empty() {
        return endpoint.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("{endpoint}?{query}")
}
