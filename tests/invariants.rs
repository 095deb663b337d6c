//! Property-style checks for the invariants and laws in §8 of the accompanying
//! design document, run against the public `Cache` façade.

use concache::Cache;

#[test]
fn count_is_bounded_by_capacity_after_every_maintenance_cycle_over_a_random_stream() {
    let cache = Cache::<u64, u64>::new(50).unwrap();
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for _ in 0..5000 {
        let op = next() % 3;
        let key = next() % 200;
        match op {
            0 => cache.add_or_update(key, key),
            1 => {
                cache.try_get(&key);
            }
            _ => {
                cache.try_remove(&key);
            }
        }
        cache.do_maintenance();
        assert!(cache.count() <= cache.capacity());
    }
}

#[test]
fn clear_followed_by_get_is_always_absent() {
    let cache = Cache::<u64, u64>::new(30).unwrap();
    for i in 0..100u64 {
        cache.add_or_update(i, i * 2);
    }
    cache.clear();
    assert_eq!(cache.count(), 0);
    for i in 0..100u64 {
        assert_eq!(cache.try_get(&i), None);
    }
}

#[test]
fn frequency_aware_admission_never_lets_estimate_exceed_saturation() {
    let cache = Cache::<u64, u64>::frequency_aware(64).unwrap();
    for i in 0..64u64 {
        cache.add_or_update(i, i);
    }
    for _ in 0..20_000 {
        cache.try_get(&(7 % 64));
        cache.do_maintenance();
    }
    // The cache stays within capacity even after heavy repeated access skews
    // the frequency sketch toward saturation for one key.
    assert!(cache.count() <= cache.capacity());
}

#[test]
fn trim_removes_at_most_requested_count_from_cold() {
    let cache = Cache::<u64, u64>::new(30).unwrap();
    for i in 0..30u64 {
        cache.add_or_update(i, i);
    }
    cache.do_maintenance();
    let before = cache.count();
    let removed = cache.trim(5);
    assert!(removed <= 5);
    assert_eq!(cache.count(), before - removed);
}
