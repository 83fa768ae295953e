//! Time-To-Live Cache Module
//!
//! Unbounded cache in which every entry owns its own expiry timer.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::cache::entry::TimedEntry;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{ExpiryTimer, TimerRuntime};

// == Timeout ==
/// Lifetime requested for a single [`TimeToLiveCache::add_or_update`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeout {
    /// Use the cache's default timeout
    #[default]
    Default,
    /// Never expire; the entry stays until removed
    Never,
    /// Expire after the given duration
    After(Duration),
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

struct Shared<K, V> {
    entries: DashMap<K, TimedEntry<V>>,
    default_timeout: Option<Duration>,
    timers: TimerRuntime,
    next_generation: AtomicU64,
    disposed: AtomicBool,
    stats: StatsRecorder,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash,
{
    // Timer callback. Holds the key's shard lock for the compare-and-remove,
    // so it serializes with every other mutation of that key.
    fn expire(&self, key: &K, generation: u64) {
        match self
            .entries
            .remove_if(key, |_, entry| entry.generation == generation)
        {
            Some(_) => {
                self.stats.record_expiration();
                debug!(generation, "Entry expired");
            }
            None => trace!(generation, "Superseded expiry timer ignored"),
        }
    }
}

// == Time To Live Cache ==
/// Thread-safe cache whose entries vanish once their own timeout elapses.
///
/// Mutations of different keys run concurrently; all mutations of one key,
/// including its timer firing, are serialized. Each armed timer carries a
/// generation number and only removes the entry if that entry still carries
/// the same generation, so a superseded timer is a no-op.
///
/// A default timeout of `None` means "infinite". Per call, [`Timeout`] picks
/// the default, infinite, or an explicit duration. Durations too large for an
/// `Instant` deadline are treated as infinite.
pub struct TimeToLiveCache<K, V>
where
    K: Eq + Hash,
{
    shared: Arc<Shared<K, V>>,
}

impl<K, V> TimeToLiveCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache whose timers run on the shared background runtime.
    ///
    /// # Errors
    /// Returns [`CacheError::OutOfRange`] if `default_timeout` is zero.
    pub fn new(default_timeout: Option<Duration>) -> Result<Self> {
        validate_timeout("default_timeout", default_timeout)?;
        Ok(Self::build(default_timeout, TimerRuntime::background()?))
    }

    /// Creates a cache whose timers run on a caller-supplied tokio runtime.
    pub fn with_runtime(default_timeout: Option<Duration>, handle: Handle) -> Result<Self> {
        validate_timeout("default_timeout", default_timeout)?;
        Ok(Self::build(default_timeout, TimerRuntime::from_handle(handle)))
    }

    /// Creates a cache using the default timeout in `config`.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.default_timeout)
    }

    fn build(default_timeout: Option<Duration>, timers: TimerRuntime) -> Self {
        let default_timeout = default_timeout.and_then(representable);
        debug!(?default_timeout, "Time-to-live cache created");
        Self {
            shared: Arc::new(Shared {
                entries: DashMap::new(),
                default_timeout,
                timers,
                next_generation: AtomicU64::new(1),
                disposed: AtomicBool::new(false),
                stats: StatsRecorder::default(),
            }),
        }
    }

    // Allocates a generation and, for finite timeouts, a timer bound to it.
    // Must be called while holding the key's entry lock.
    fn arm(&self, key: &K, timeout: Option<Duration>) -> (u64, Option<ExpiryTimer>) {
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let timer = timeout.map(|delay| {
            let shared: Weak<Shared<K, V>> = Arc::downgrade(&self.shared);
            let key = key.clone();
            self.shared.timers.spawn_expiry(delay, move || {
                if let Some(shared) = shared.upgrade() {
                    shared.expire(&key, generation);
                }
            })
        });
        (generation, timer)
    }

    fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    // == Add Or Update ==
    /// Inserts `key` or replaces its value.
    ///
    /// A new key gets a timer for the resolved `timeout`; [`Timeout::Never`]
    /// arms none, even when the cache has a finite default. For an existing key the value is replaced in place; with
    /// `restart_timer` false the original deadline is kept, with it true the
    /// old timer is cancelled and a new one armed in the same critical
    /// section.
    ///
    /// # Errors
    /// - [`CacheError::OutOfRange`] if `timeout` is zero
    /// - [`CacheError::Disposed`] after [`dispose`](Self::dispose)
    pub fn add_or_update(
        &self,
        key: K,
        value: V,
        timeout: Timeout,
        restart_timer: bool,
    ) -> Result<()> {
        let timeout = match timeout {
            Timeout::Default => self.shared.default_timeout,
            Timeout::Never => None,
            Timeout::After(duration) => {
                validate_timeout("timeout", Some(duration))?;
                representable(duration)
            }
        };

        let entry = self.shared.entries.entry(key);
        // Checked under the key's lock so dispose cannot miss this insert
        if self.is_disposed() {
            warn!("Update rejected: cache disposed");
            return Err(CacheError::Disposed);
        }

        match entry {
            Entry::Occupied(mut occupied) => {
                if restart_timer {
                    let (generation, timer) = self.arm(occupied.key(), timeout);
                    occupied.get_mut().rearm(generation, timeout, timer);
                }
                occupied.get_mut().value = value;
            }
            Entry::Vacant(vacant) => {
                let (generation, timer) = self.arm(vacant.key(), timeout);
                vacant.insert(TimedEntry::new(value, generation, timeout, timer));
            }
        }
        Ok(())
    }

    /// Inserts `key` with the default timeout, keeping the deadline of an
    /// existing entry.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        self.add_or_update(key, value, Timeout::Default, false)
    }

    /// Inserts `seed` for an absent key, or replaces the current value with
    /// `update(key, current)`. Returns the value now stored.
    ///
    /// The read-modify-write runs under the key's lock, so concurrent
    /// accumulating callers never lose an update. `update` must not call
    /// back into this cache. Existing deadlines are kept.
    pub fn add_or_update_with<F>(&self, key: K, seed: V, update: F) -> Result<V>
    where
        F: FnOnce(&K, &V) -> V,
    {
        let entry = self.shared.entries.entry(key);
        if self.is_disposed() {
            warn!("Update rejected: cache disposed");
            return Err(CacheError::Disposed);
        }

        match entry {
            Entry::Occupied(mut occupied) => {
                let next = update(occupied.key(), &occupied.get().value);
                occupied.get_mut().value = next.clone();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                let timeout = self.shared.default_timeout;
                let (generation, timer) = self.arm(vacant.key(), timeout);
                vacant.insert(TimedEntry::new(seed.clone(), generation, timeout, timer));
                Ok(seed)
            }
        }
    }

    // == Lookups ==
    /// Returns true if `key` is live. Does not affect its timer.
    pub fn contains(&self, key: &K) -> bool {
        self.shared.entries.contains_key(key)
    }

    /// Returns a copy of the value stored under `key`.
    pub fn try_get(&self, key: &K) -> Option<V> {
        let value = self.shared.entries.get(key).map(|e| e.value.clone());
        self.shared.stats.record_lookup(value.is_some());
        value
    }

    /// Remaining lifetime of `key`; None if absent or never expiring.
    pub fn expires_in(&self, key: &K) -> Option<Duration> {
        self.shared.entries.get(key).and_then(|e| e.remaining())
    }

    // == Remove ==
    /// Removes `key` and cancels its timer, returning the value it held.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.shared.entries.remove(key).map(|(_, entry)| entry.value)
    }
}

impl<K, V> TimeToLiveCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Returns a copy of the value stored under `key`.
    ///
    /// # Errors
    /// Returns [`CacheError::KeyNotFound`] if the key is absent.
    pub fn get(&self, key: &K) -> Result<V> {
        self.try_get(key)
            .ok_or_else(|| CacheError::KeyNotFound(format!("{:?}", key)))
    }
}

impl<K, V> TimeToLiveCache<K, V>
where
    K: Eq + Hash,
{
    // == Clear ==
    /// Removes every entry and cancels every timer; the cache remains usable.
    pub fn clear(&self) {
        let removed = self.shared.entries.len();
        self.shared.entries.clear();
        debug!(removed, "Time-to-live cache cleared");
    }

    // == Dispose ==
    /// Cancels every timer, empties the map and rejects further updates.
    ///
    /// Idempotent. Once this returns no timer will remove anything: a timer
    /// already racing for a key finds no entry with its generation.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.entries.clear();
        debug!("Time-to-live cache disposed");
    }

    // == Count ==
    /// Number of live entries.
    pub fn count(&self) -> usize {
        self.shared.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.shared.default_timeout
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.shared.stats.snapshot(self.count())
    }
}

impl<K: Eq + Hash, V> Drop for TimeToLiveCache<K, V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<K: Eq + Hash, V> fmt::Debug for TimeToLiveCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeToLiveCache")
            .field("default_timeout", &self.shared.default_timeout)
            .field("count", &self.count())
            .field("disposed", &self.shared.disposed.load(Ordering::Relaxed))
            .finish()
    }
}

// A deadline past what `Instant` can represent is treated as never expiring
fn representable(timeout: Duration) -> Option<Duration> {
    Instant::now().checked_add(timeout).map(|_| timeout)
}

fn validate_timeout(name: &'static str, timeout: Option<Duration>) -> Result<()> {
    match timeout {
        Some(t) if t.is_zero() => Err(CacheError::out_of_range(
            name,
            "must be positive or infinite, got 0",
        )),
        _ => Ok(()),
    }
}
