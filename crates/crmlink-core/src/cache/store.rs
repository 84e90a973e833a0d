//! Thread-safe TTL store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

use super::{CacheEntry, CacheKey};

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Entry count above which `put` first sweeps expired entries. After a
/// sweep the next one waits until the map doubles past what survived.
const SWEEP_THRESHOLD: usize = 1024;

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
    /// Size at which the next `put` sweeps; zero means [`SWEEP_THRESHOLD`].
    sweep_at: usize,
}

/// Cache of webhook results keyed by `(method, params)`.
///
/// Owned by one client (or injected into several); a single mutex guards the
/// map and counters, since reads update access metadata too.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key_for<P: Serialize + ?Sized>(method: &str, params: &P) -> Option<CacheKey> {
        match CacheKey::new(method, params) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(method, error = %e, "cannot build cache key, bypassing cache");
                None
            }
        }
    }

    /// Look up a cached result.
    ///
    /// `None` is a miss (never stored, expired, or unkeyable params);
    /// `Some(None)` is a hit on a call that returned nothing.
    pub fn get<P: Serialize + ?Sized>(&self, method: &str, params: &P) -> Option<Option<Value>> {
        let key = Self::key_for(method, params);
        let mut inner = self.lock();
        let Some(key) = key else {
            inner.misses += 1;
            return None;
        };
        let ttl = self.ttl;
        let hit = match inner.entries.get_mut(&key) {
            Some(entry) if !entry.is_expired(ttl) => {
                entry.access_count += 1;
                entry.last_accessed_at = Instant::now();
                Some(entry.value.clone())
            }
            _ => None,
        };
        if hit.is_some() {
            inner.hits += 1;
            tracing::debug!(method, "cache hit");
        } else {
            inner.misses += 1;
            tracing::debug!(method, "cache miss");
        }
        hit
    }

    /// Store a result, replacing any previous entry with a fresh timestamp.
    /// `None` is stored as an explicit empty result.
    pub fn put<P: Serialize + ?Sized>(&self, method: &str, params: &P, value: Option<Value>) {
        let Some(key) = Self::key_for(method, params) else {
            return;
        };
        let mut inner = self.lock();
        inner.entries.insert(key, CacheEntry::new(value));
        if inner.entries.len() > inner.sweep_at.max(SWEEP_THRESHOLD) {
            let ttl = self.ttl;
            let before = inner.entries.len();
            inner.entries.retain(|_, e| !e.is_expired(ttl));
            let kept = inner.entries.len();
            inner.sweep_at = kept.saturating_mul(2).max(SWEEP_THRESHOLD);
            tracing::debug!(removed = before - kept, next_sweep_at = inner.sweep_at, "cache sweep on put");
        }
    }

    /// Drop the entry for `(method, params)`. Returns whether one existed.
    pub fn invalidate<P: Serialize + ?Sized>(&self, method: &str, params: &P) -> bool {
        let Some(key) = Self::key_for(method, params) else {
            return false;
        };
        self.lock().entries.remove(&key).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.sweep_at = 0;
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.is_expired(ttl));
        let removed = before - inner.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired cache entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
