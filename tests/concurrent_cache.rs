//! Multi-threaded scenario tests exercising the cache façade end to end, mirroring
//! the concrete scenarios in §8 of the accompanying design document that need more
//! than one thread to be meaningful.

use std::sync::Arc;
use std::thread;

use concache::Cache;

#[test]
fn count_never_exceeds_capacity_under_concurrent_inserts() {
    let cache = Arc::new(Cache::<u64, u64>::new(64).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500u64 {
                    let key = t * 1000 + i;
                    cache.add_or_update(key, key);
                    if i % 16 == 0 {
                        cache.do_maintenance();
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    cache.do_maintenance();
    assert!(cache.count() <= cache.capacity());
}

#[test]
fn a_get_after_add_or_update_from_the_same_thread_always_sees_the_update() {
    let cache = Cache::<u64, u64>::new(256).unwrap();
    for i in 0..2000u64 {
        cache.add_or_update(i % 50, i);
        assert_eq!(cache.try_get(&(i % 50)), Some(i));
    }
}

#[test]
fn concurrent_readers_and_writers_never_observe_a_stale_value_written_by_themselves() {
    let cache = Arc::new(Cache::<u64, u64>::new(32).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let key = t;
                for v in 0..1000u64 {
                    cache.add_or_update(key, v);
                    assert_eq!(cache.try_get(&key), Some(v));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn clear_is_visible_to_every_thread_once_joined() {
    let cache = Arc::new(Cache::<u64, u64>::new(64).unwrap());
    for i in 0..64u64 {
        cache.add_or_update(i, i);
    }
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..64u64 {
                    cache.try_get(&i);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    cache.clear();
    assert_eq!(cache.count(), 0);
    for i in 0..64u64 {
        assert_eq!(cache.try_get(&i), None);
    }
}

#[test]
fn frequency_aware_cache_survives_under_concurrent_churn() {
    let cache = Arc::new(Cache::<u64, u64>::frequency_aware(32).unwrap());
    cache.add_or_update(1, 100);
    for _ in 0..30 {
        cache.try_get(&1);
        cache.do_maintenance();
    }
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..2000u64 {
                    let key = 1000 + t * 10_000 + i;
                    cache.add_or_update(key, key);
                    cache.do_maintenance();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    cache.do_maintenance();
    assert_eq!(cache.try_get(&1), Some(100));
    assert!(cache.count() <= cache.capacity());
}
