//! Response cache for repeated lookups.
//!
//! Entries are keyed by method name plus canonical parameters and expire a
//! fixed TTL after they were stored, regardless of how often they are read.
//! An explicitly cached "no result" (`None`) is a hit, distinct from a key
//! that was never stored.

mod entry;
mod key;
mod store;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use store::{CacheStats, ResponseCache, DEFAULT_TTL};
