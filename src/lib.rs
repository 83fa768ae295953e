//! Bounded Cache - thread-safe in-memory key/value caches
//!
//! Provides a capacity-bounded cache that evicts by recency (LRU or MRU)
//! and a cache that expires each entry after its own time-to-live.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, EvictionDirection, RecencyBoundedCache, TimeToLiveCache, Timeout};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
