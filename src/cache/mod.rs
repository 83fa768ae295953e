//! Cache Module
//!
//! Provides a recency-bounded cache (LRU/MRU eviction) and a cache with
//! per-entry time-to-live expiry.

mod entry;
mod order;
mod recency;
mod stats;
mod ttl;


// Re-export public types
pub(crate) use entry::CacheEntry;
pub use recency::{EvictionDirection, RecencyBoundedCache};
pub use stats::CacheStats;
pub use ttl::{TimeToLiveCache, Timeout};
