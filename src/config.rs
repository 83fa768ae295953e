//! Configuration Module
//!
//! Construction-time parameters for the caches, optionally loaded from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionDirection;
use crate::error::{CacheError, Result};

/// Cache construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries a recency-bounded cache holds
    pub capacity: usize,
    /// Which end of the recency order is evicted
    pub direction: EvictionDirection,
    /// Default entry lifetime for a time-to-live cache, None = infinite
    pub default_timeout: Option<Duration>,
}

impl CacheConfig {
    /// Creates a CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum entries (default: 1000)
    /// - `CACHE_EVICTION_DIRECTION` - `lru` or `mru` (default: lru)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: infinite)
    ///
    /// Unset variables fall back to their defaults; set but unparsable ones
    /// are an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: read_var("CACHE_CAPACITY")?.unwrap_or(defaults.capacity),
            direction: read_var("CACHE_EVICTION_DIRECTION")?.unwrap_or(defaults.direction),
            default_timeout: read_var::<u64>("CACHE_DEFAULT_TTL_MS")?
                .map(Duration::from_millis)
                .or(defaults.default_timeout),
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            direction: EvictionDirection::EvictLeastRecent,
            default_timeout: None,
        }
    }
}

fn read_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::Config(format!("{}={:?} is not valid", name, raw))),
        Err(_) => Ok(None),
    }
}
