use std::time::{Duration, Instant};

use serde_json::Value;

/// One cached result. `value == None` records that the call returned nothing.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Option<Value>,
    pub created_at: Instant,
    pub access_count: u64,
    pub last_accessed_at: Instant,
}

impl CacheEntry {
    pub(super) fn new(value: Option<Value>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            access_count: 0,
            last_accessed_at: now,
        }
    }

    /// Expiry is measured from creation only; reads do not extend it.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}
