//! Recency Bounded Cache Module
//!
//! Fixed-capacity cache that evicts by recency of touch. The same engine
//! serves both LRU (discard oldest) and MRU (discard newest) workloads.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::order::RecencyOrder;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Eviction Direction ==
/// Selects which end of the recency order is evicted when the cache is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EvictionDirection {
    /// Discard the least recently touched entry (LRU)
    #[default]
    EvictLeastRecent,
    /// Discard the most recently touched entry (MRU)
    EvictMostRecent,
}

impl fmt::Display for EvictionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionDirection::EvictLeastRecent => f.write_str("least-recent"),
            EvictionDirection::EvictMostRecent => f.write_str("most-recent"),
        }
    }
}

impl FromStr for EvictionDirection {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" | "least-recent" => Ok(EvictionDirection::EvictLeastRecent),
            "mru" | "most-recent" => Ok(EvictionDirection::EvictMostRecent),
            other => Err(CacheError::Config(format!(
                "unknown eviction direction '{}', expected lru or mru",
                other
            ))),
        }
    }
}

#[derive(Debug)]
struct State<K, V> {
    order: RecencyOrder<K, V>,
    disposed: bool,
}

// == Recency Bounded Cache ==
/// Thread-safe cache holding at most `capacity` entries.
///
/// Only [`insert`](Self::insert) refreshes recency; lookups are peeks and never
/// reorder entries. All operations run under one per-instance lock, so every
/// observer sees the mutations in a single total order.
pub struct RecencyBoundedCache<K, V> {
    state: RwLock<State<K, V>>,
    capacity: usize,
    direction: EvictionDirection,
    stats: StatsRecorder,
}

impl<K, V> RecencyBoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Errors
    /// Returns [`CacheError::OutOfRange`] if `capacity` is 0.
    pub fn new(capacity: usize, direction: EvictionDirection) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::out_of_range(
                "capacity",
                "must be at least 1, got 0",
            ));
        }

        debug!(capacity, %direction, "Recency bounded cache created");

        Ok(Self {
            state: RwLock::new(State {
                order: RecencyOrder::with_capacity(capacity),
                disposed: false,
            }),
            capacity,
            direction,
            stats: StatsRecorder::default(),
        })
    }

    /// Creates a cache that discards the least recently touched entry.
    pub fn lru(capacity: usize) -> Result<Self> {
        Self::new(capacity, EvictionDirection::EvictLeastRecent)
    }

    /// Creates a cache that discards the most recently touched entry.
    pub fn mru(capacity: usize) -> Result<Self> {
        Self::new(capacity, EvictionDirection::EvictMostRecent)
    }

    /// Creates a cache from the capacity and direction in `config`.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.capacity, config.direction)
    }

    // == Insert ==
    /// Inserts or updates `key`, making it the most recently touched entry.
    ///
    /// When a new key arrives at a full cache, exactly one entry is evicted
    /// from the end selected by the eviction direction before the new key is
    /// added. Updating an existing key never evicts.
    ///
    /// # Errors
    /// Returns [`CacheError::Disposed`] after [`dispose`](Self::dispose).
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        let mut state = self.state.write();
        if state.disposed {
            warn!("Insert rejected: cache disposed");
            return Err(CacheError::Disposed);
        }

        let value = match state.order.touch(&key, value) {
            Ok(()) => return Ok(()),
            Err(value) => value,
        };

        if state.order.len() >= self.capacity {
            let evicted = match self.direction {
                EvictionDirection::EvictLeastRecent => state.order.pop_oldest(),
                EvictionDirection::EvictMostRecent => state.order.pop_newest(),
            };
            if evicted.is_some() {
                self.stats.record_eviction();
                debug!(direction = %self.direction, "Evicted entry");
            }
        }

        state.order.push_front(key, value);
        debug_assert!(state.order.len() <= self.capacity);
        Ok(())
    }

    // == Try Get ==
    /// Returns a copy of the value stored under `key` without touching it.
    pub fn try_get(&self, key: &K) -> Option<V> {
        let value = self.state.read().order.peek(key).cloned();
        self.stats.record_lookup(value.is_some());
        value
    }

    /// Returns true if `key` is present, without touching it.
    pub fn contains(&self, key: &K) -> bool {
        self.state.read().order.contains(key)
    }

    // == Clear ==
    /// Removes every entry; the cache remains usable.
    pub fn clear(&self) {
        let mut state = self.state.write();
        let removed = state.order.len();
        state.order.clear();
        debug!(removed, "Recency bounded cache cleared");
    }

    /// Keys from most to least recently touched.
    pub fn keys(&self) -> Vec<K> {
        self.state.read().order.keys()
    }
}

impl<K, V> RecencyBoundedCache<K, V> {
    // == Dispose ==
    /// Drops every entry and rejects further inserts. Idempotent.
    pub fn dispose(&self) {
        let mut state = self.state.write();
        if state.disposed {
            return;
        }
        state.disposed = true;
        // Swap in an empty order so the arena and index memory is released now
        state.order = RecencyOrder::with_capacity(1);
        debug!("Recency bounded cache disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.state.read().disposed
    }

    // == Count ==
    /// Current number of live entries (0..=capacity).
    pub fn count(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn direction(&self) -> EvictionDirection {
        self.direction
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.count())
    }
}

impl<K, V> fmt::Debug for RecencyBoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecencyBoundedCache")
            .field("capacity", &self.capacity)
            .field("direction", &self.direction)
            .field("count", &self.count())
            .finish()
    }
}
