//! Integration Tests for the time-to-live cache
//!
//! Timing tests use short timeouts and generous settle periods to tolerate
//! scheduler jitter.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bounded_cache::{CacheConfig, CacheError, TimeToLiveCache, Timeout};

const SHORT: Duration = Duration::from_millis(150);
const SETTLE: Duration = Duration::from_millis(600);

// == Expiry ==

#[test]
fn test_entry_present_before_and_absent_after_timeout() {
    common::init_tracing();
    let cache = TimeToLiveCache::new(None).unwrap();
    cache
        .add_or_update("session", "token", Timeout::After(SHORT), false)
        .unwrap();

    assert_eq!(cache.get(&"session"), Ok("token"));
    thread::sleep(SETTLE);

    assert_eq!(
        cache.get(&"session"),
        Err(CacheError::KeyNotFound("\"session\"".to_string()))
    );
    assert_eq!(cache.count(), 0);
}

#[test]
fn test_entries_expire_independently() {
    common::init_tracing();
    let cache = TimeToLiveCache::new(None).unwrap();
    cache.add_or_update(1, "short", Timeout::After(SHORT), false).unwrap();
    cache
        .add_or_update(2, "long", Timeout::After(Duration::from_secs(30)), false)
        .unwrap();
    cache.insert(3, "forever").unwrap();

    thread::sleep(SETTLE);

    assert!(!cache.contains(&1));
    assert!(cache.contains(&2));
    assert!(cache.contains(&3));
    assert_eq!(cache.count(), 2);
}

#[test]
fn test_from_config_uses_default_timeout() {
    let config = CacheConfig {
        default_timeout: Some(SHORT),
        ..CacheConfig::default()
    };
    let cache = TimeToLiveCache::from_config(&config).unwrap();

    cache.insert("a", 1).unwrap();
    assert_eq!(cache.default_timeout(), Some(SHORT));
    thread::sleep(SETTLE);

    assert!(cache.is_empty());
}

#[test]
fn test_zero_default_from_config_is_out_of_range() {
    let config = CacheConfig {
        default_timeout: Some(Duration::ZERO),
        ..CacheConfig::default()
    };

    let err = TimeToLiveCache::<u32, u32>::from_config(&config).unwrap_err();

    assert!(matches!(err, CacheError::OutOfRange { .. }));
}

#[test]
fn test_never_entry_outlives_finite_default() {
    common::init_tracing();
    let cache = TimeToLiveCache::new(Some(SHORT)).unwrap();
    cache.add_or_update("pinned", 1, Timeout::Never, false).unwrap();
    cache
        .add_or_update("far", 2, Timeout::After(Duration::MAX), false)
        .unwrap();
    cache.insert("default", 3).unwrap();

    thread::sleep(SETTLE);

    assert_eq!(cache.get(&"pinned"), Ok(1));
    assert_eq!(cache.get(&"far"), Ok(2));
    assert!(!cache.contains(&"default"));
    assert_eq!(cache.stats().expirations, 1);
}

// == Restart Semantics ==

#[test]
fn test_shorter_timeout_without_restart_does_not_shorten_lifetime() {
    let cache = TimeToLiveCache::new(None).unwrap();
    cache
        .add_or_update("a", 1, Timeout::After(Duration::from_secs(30)), false)
        .unwrap();

    cache.add_or_update("a", 2, Timeout::After(SHORT), false).unwrap();
    thread::sleep(SETTLE);

    assert_eq!(cache.try_get(&"a"), Some(2));
}

#[test]
fn test_repeated_restarts_keep_entry_alive() {
    let cache = TimeToLiveCache::new(None).unwrap();
    let timeout = Duration::from_millis(300);

    for i in 0..6 {
        cache.add_or_update("a", i, Timeout::After(timeout), true).unwrap();
        thread::sleep(Duration::from_millis(100));
    }
    assert_eq!(cache.try_get(&"a"), Some(5));

    thread::sleep(Duration::from_millis(800));
    assert!(!cache.contains(&"a"));
    assert_eq!(cache.stats().expirations, 1);
}

// == Dispose ==

#[test]
fn test_dispose_cancels_all_timers() {
    common::init_tracing();
    let cache = TimeToLiveCache::new(None).unwrap();
    for key in 0..100 {
        cache.add_or_update(key, key, Timeout::After(SHORT), false).unwrap();
    }

    cache.dispose();
    cache.dispose();
    thread::sleep(SETTLE);

    assert_eq!(cache.count(), 0);
    assert_eq!(cache.stats().expirations, 0);
    assert_eq!(cache.insert(1, 1), Err(CacheError::Disposed));
}

// == Concurrency ==

#[test]
fn test_concurrent_same_key_updates_keep_one_entry() {
    common::init_tracing();
    let cache = Arc::new(TimeToLiveCache::new(Some(Duration::from_secs(30))).unwrap());
    let threads = 10u32;
    let per_thread = 1_000u32;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let restart = i % 2 == 0;
                    cache
                        .add_or_update("shared", t * per_thread + i, Timeout::Default, restart)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.count(), 1);
    let value = cache.get(&"shared").unwrap();
    assert!(value < threads * per_thread);
}

#[test]
fn test_concurrent_accumulator_loses_no_updates() {
    let cache = Arc::new(TimeToLiveCache::new(None).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..500 {
                    cache
                        .add_or_update_with("hits", 1u64, |_, n| n + 1)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.get(&"hits"), Ok(4_000));
}

#[test]
fn test_restart_racing_with_expiry_never_loses_entry() {
    let cache = Arc::new(TimeToLiveCache::new(None).unwrap());
    let tight = Duration::from_millis(1);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..2_000u32 {
                    cache.add_or_update(t, i, Timeout::After(tight), true).unwrap();
                }
                // Final restart with a long timeout must win over any
                // in-flight short timer for this key.
                cache
                    .add_or_update(t, u32::MAX, Timeout::After(Duration::from_secs(30)), true)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    thread::sleep(Duration::from_millis(200));

    for t in 0..4 {
        assert_eq!(cache.try_get(&t), Some(u32::MAX));
    }
}

// == Caller-Supplied Runtime ==

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timers_on_caller_runtime() {
    common::init_tracing();
    let cache = TimeToLiveCache::with_runtime(None, tokio::runtime::Handle::current()).unwrap();
    cache.add_or_update("a", 1, Timeout::After(SHORT), false).unwrap();

    assert!(cache.expires_in(&"a").unwrap() <= SHORT);
    tokio::time::sleep(SETTLE).await;

    assert!(!cache.contains(&"a"));
    assert_eq!(cache.stats().expirations, 1);
}
