//! Cache Entry Module
//!
//! Defines the per-entry records held by each cache kind.

use std::time::{Duration, Instant};

use crate::tasks::ExpiryTimer;

// == Cache Entry ==
/// A key/value pair owned by a recency-bounded cache.
///
/// The key is fixed once inserted; only the value is replaced on update.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<K, V> {
    key: K,
    /// The stored value
    pub(crate) value: V,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    pub(crate) fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Returns the entry's key.
    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    /// Replaces the value, returning the previous one.
    pub(crate) fn replace(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }
}

// == Timed Entry ==
/// A value held by a time-to-live cache together with its expiry timer.
///
/// Dropping the entry cancels its timer.
///
/// `generation` identifies the timer currently armed for this entry. A timer
/// that fires with a different generation was superseded and must not remove
/// the entry.
#[derive(Debug)]
pub(crate) struct TimedEntry<V> {
    pub(crate) value: V,
    pub(crate) generation: u64,
    /// Expiration instant, None = never expires
    pub(crate) expires_at: Option<Instant>,
    timer: Option<ExpiryTimer>,
}

impl<V> TimedEntry<V> {
    pub(crate) fn new(
        value: V,
        generation: u64,
        timeout: Option<Duration>,
        timer: Option<ExpiryTimer>,
    ) -> Self {
        Self {
            value,
            generation,
            expires_at: deadline(timeout),
            timer,
        }
    }

    /// Swaps in a freshly armed timer, cancelling the previous one.
    pub(crate) fn rearm(
        &mut self,
        generation: u64,
        timeout: Option<Duration>,
        timer: Option<ExpiryTimer>,
    ) {
        self.generation = generation;
        self.expires_at = deadline(timeout);
        self.timer = timer;
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if the entry never expires.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed but the
    /// timer has not yet removed the entry.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

// None when there is no timeout or the deadline overflows `Instant`
fn deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_replace_keeps_key() {
        let mut entry = CacheEntry::new("key1", 1);

        let old = entry.replace(2);

        assert_eq!(old, 1);
        assert_eq!(entry.value, 2);
        assert_eq!(*entry.key(), "key1");
    }

    #[test]
    fn test_timed_entry_no_expiration() {
        let entry = TimedEntry::new("value", 1, None, None);

        assert!(entry.expires_at.is_none());
        assert!(entry.remaining().is_none());
    }

    #[test]
    fn test_timed_entry_remaining() {
        let entry = TimedEntry::new("value", 1, Some(Duration::from_secs(10)), None);

        let remaining = entry.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));
    }

    #[test]
    fn test_timed_entry_remaining_after_deadline() {
        let mut entry = TimedEntry::new("value", 1, Some(Duration::from_secs(10)), None);
        entry.expires_at = Some(Instant::now());

        assert_eq!(entry.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_rearm_replaces_generation_and_deadline() {
        let mut entry = TimedEntry::new("value", 1, Some(Duration::from_millis(10)), None);

        entry.rearm(7, Some(Duration::from_secs(60)), None);

        assert_eq!(entry.generation, 7);
        assert!(entry.remaining().unwrap() > Duration::from_secs(59));
    }

    #[test]
    fn test_overflowing_timeout_never_expires() {
        let mut entry = TimedEntry::new("value", 1, Some(Duration::MAX), None);
        assert!(entry.remaining().is_none());

        entry.rearm(2, Some(Duration::MAX), None);
        assert!(entry.expires_at.is_none());
    }
}
