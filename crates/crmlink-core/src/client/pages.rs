//! Lazy paginated reads for list methods.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use super::ApiClient;
use crate::error::ApiError;

/// Request parameter carrying the page size.
pub const PAGE_SIZE_PARAM: &str = "limit";

/// Iterator over every row of a list method, fetching one page at a time.
///
/// Each page is requested with `start = <next from the previous page>` and
/// goes through the client's limiter and retry policy. Iteration stops when
/// the server stops sending `next`, returns an empty page, or a page fails
/// (the error is yielded once, then the iterator ends). To read again, call
/// [`ApiClient::fetch_all`] again.
#[derive(Debug)]
pub struct Pages<'a> {
    client: &'a ApiClient,
    endpoint: String,
    params: Map<String, Value>,
    start: u64,
    buffer: VecDeque<Value>,
    pages_fetched: u32,
    done: bool,
}

impl<'a> Pages<'a> {
    pub(super) fn new(client: &'a ApiClient, endpoint: &str, filter: Value) -> Self {
        let mut params = Map::new();
        match filter {
            Value::Null => {}
            Value::Object(ref m) if m.is_empty() => {}
            filter => {
                params.insert("filter".to_string(), filter);
            }
        }
        Self {
            client,
            endpoint: endpoint.to_string(),
            params,
            start: 0,
            buffer: VecDeque::new(),
            pages_fetched: 0,
            done: false,
        }
    }

    /// Add an extra parameter sent with every page (`select`, `order`, ...).
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Ask for `size` rows per page (sent as `limit`). Without it the
    /// server's default page size applies. Zero is ignored.
    pub fn with_page_size(self, size: u32) -> Self {
        if size == 0 {
            return self;
        }
        self.with_param(PAGE_SIZE_PARAM, Value::from(size))
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    fn fetch_page(&mut self) -> Result<(), ApiError> {
        let mut params = self.params.clone();
        params.insert("start".to_string(), Value::from(self.start));
        let response = self.client.call(&self.endpoint, Value::Object(params))?;
        self.pages_fetched += 1;

        let next = response.next;
        let items = response.into_items();
        tracing::debug!(
            endpoint = %self.endpoint,
            start = self.start,
            rows = items.len(),
            next,
            "fetched page"
        );
        if items.is_empty() {
            self.done = true;
            return Ok(());
        }
        self.buffer.extend(items);
        match next {
            // A cursor that does not advance would loop forever.
            Some(n) if n > self.start => self.start = n,
            _ => self.done = true,
        }
        Ok(())
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Value, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

impl ApiClient {
    /// Lazily read every row of a list method matching `filter`.
    pub fn fetch_all(&self, endpoint: &str, filter: Value) -> Pages<'_> {
        Pages::new(self, endpoint, filter)
    }

    /// Read every row of a list method matching `filter` into a vector.
    pub fn fetch_all_pages(&self, endpoint: &str, filter: Value) -> Result<Vec<Value>, ApiError> {
        self.fetch_all(endpoint, filter).collect()
    }
}
