//! Time-expiration policy contract and the three concrete policies.

use std::time::Duration;

use crate::constants::MAX_TTL_NANOS;
use crate::error::{CacheError, Result};
use crate::expiry::Clock;
use crate::node::NO_EXPIRY;

/// The policy-facing contract every expiry strategy implements: when to stamp a
/// fresh expiry timestamp, and when a stamped Node must be discarded.
pub trait ExpiryPolicy<K, V>: Send + Sync {
    /// Timestamp to stamp on a newly created Node.
    fn create_timestamp(&self, key: &K, value: &V, now: u64) -> u64;

    /// Timestamp to stamp on a read hit. Returning the Node's current timestamp
    /// unchanged means "do not refresh on read".
    fn touch_timestamp(&self, key: &K, value: &V, current: u64, now: u64) -> u64;

    /// Timestamp to stamp on an update (`AddOrUpdate`/`TryUpdate`).
    fn update_timestamp(&self, key: &K, value: &V, current: u64, now: u64) -> u64;

    fn should_discard(&self, expire_at: u64, now: u64) -> bool {
        expire_at != NO_EXPIRY && now >= expire_at
    }

    fn can_discard(&self) -> bool {
        true
    }
}

impl<K, V> std::fmt::Debug for dyn ExpiryPolicy<K, V> + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryPolicy").finish_non_exhaustive()
    }
}

fn ttl_to_nanos(ttl: Duration) -> Result<u64> {
    let nanos = ttl.as_nanos();
    if nanos == 0 {
        return Err(CacheError::invalid_ttl("ttl must be greater than zero"));
    }
    if nanos > MAX_TTL_NANOS as u128 {
        return Err(CacheError::invalid_ttl("ttl exceeds the representable tick range"));
    }
    Ok(nanos as u64)
}

/// No expiration: Nodes never discard on age.
pub struct NeverExpire;

impl<K, V> ExpiryPolicy<K, V> for NeverExpire {
    fn create_timestamp(&self, _key: &K, _value: &V, _now: u64) -> u64 {
        NO_EXPIRY
    }

    fn touch_timestamp(&self, _key: &K, _value: &V, current: u64, _now: u64) -> u64 {
        current
    }

    fn update_timestamp(&self, _key: &K, _value: &V, current: u64, _now: u64) -> u64 {
        current
    }

    fn should_discard(&self, _expire_at: u64, _now: u64) -> bool {
        false
    }

    fn can_discard(&self) -> bool {
        false
    }
}

/// Timestamp set on create and update only; reads do not refresh it.
pub struct ExpireAfterWrite<C: Clock> {
    ttl_nanos: u64,
    clock: C,
}

impl<C: Clock> std::fmt::Debug for ExpireAfterWrite<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpireAfterWrite").field("ttl_nanos", &self.ttl_nanos).finish()
    }
}

impl<C: Clock> ExpireAfterWrite<C> {
    pub fn new(ttl: Duration, clock: C) -> Result<Self> {
        Ok(Self { ttl_nanos: ttl_to_nanos(ttl)?, clock })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock, K, V> ExpiryPolicy<K, V> for ExpireAfterWrite<C> {
    fn create_timestamp(&self, _key: &K, _value: &V, now: u64) -> u64 {
        now.saturating_add(self.ttl_nanos)
    }

    fn touch_timestamp(&self, _key: &K, _value: &V, current: u64, _now: u64) -> u64 {
        current
    }

    fn update_timestamp(&self, _key: &K, _value: &V, _current: u64, now: u64) -> u64 {
        now.saturating_add(self.ttl_nanos)
    }
}

/// Timestamp refreshed on every read as well as on create/update.
pub struct ExpireAfterAccess<C: Clock> {
    ttl_nanos: u64,
    clock: C,
}

impl<C: Clock> ExpireAfterAccess<C> {
    pub fn new(ttl: Duration, clock: C) -> Result<Self> {
        Ok(Self { ttl_nanos: ttl_to_nanos(ttl)?, clock })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock, K, V> ExpiryPolicy<K, V> for ExpireAfterAccess<C> {
    fn create_timestamp(&self, _key: &K, _value: &V, now: u64) -> u64 {
        now.saturating_add(self.ttl_nanos)
    }

    fn touch_timestamp(&self, _key: &K, _value: &V, _current: u64, now: u64) -> u64 {
        now.saturating_add(self.ttl_nanos)
    }

    fn update_timestamp(&self, _key: &K, _value: &V, _current: u64, now: u64) -> u64 {
        now.saturating_add(self.ttl_nanos)
    }
}

/// Delegates TTL computation to a closure per event; the closure may return the
/// current timestamp unchanged to leave an entry's expiry as-is.
pub struct CustomExpiry<K, V, F>
where
    F: Fn(&K, &V, u64, u64) -> u64 + Send + Sync,
{
    compute: F,
    _marker: std::marker::PhantomData<fn(&K, &V)>,
}

impl<K, V, F> CustomExpiry<K, V, F>
where
    F: Fn(&K, &V, u64, u64) -> u64 + Send + Sync,
{
    pub fn new(compute: F) -> Self {
        Self { compute, _marker: std::marker::PhantomData }
    }
}

impl<K, V, F> ExpiryPolicy<K, V> for CustomExpiry<K, V, F>
where
    F: Fn(&K, &V, u64, u64) -> u64 + Send + Sync,
{
    fn create_timestamp(&self, key: &K, value: &V, now: u64) -> u64 {
        (self.compute)(key, value, NO_EXPIRY, now)
    }

    fn touch_timestamp(&self, key: &K, value: &V, current: u64, now: u64) -> u64 {
        (self.compute)(key, value, current, now)
    }

    fn update_timestamp(&self, key: &K, value: &V, current: u64, now: u64) -> u64 {
        (self.compute)(key, value, current, now)
    }
}

/// Builds a single expiry policy from at most one of an after-write or an
/// after-access TTL. Combining both is rejected at construction, since a Node
/// cannot carry two independently-refreshed expiry timestamps at once.
pub fn combined<K, V, C>(
    after_write: Option<Duration>,
    after_access: Option<Duration>,
    clock: C,
) -> Result<Box<dyn ExpiryPolicy<K, V>>>
where
    C: Clock + 'static,
    K: 'static,
    V: 'static,
{
    match (after_write, after_access) {
        (Some(_), Some(_)) => Err(CacheError::misconfigured_policy(
            "cannot combine expire-after-write and expire-after-access in a single policy",
        )),
        (Some(write_ttl), None) => Ok(Box::new(ExpireAfterWrite::new(write_ttl, clock)?)),
        (None, Some(access_ttl)) => Ok(Box::new(ExpireAfterAccess::new(access_ttl, clock)?)),
        (None, None) => Ok(Box::new(NeverExpire)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::FakeClock;

    #[test]
    fn ttl_of_zero_is_rejected() {
        let clock = FakeClock::new();
        let err = ExpireAfterWrite::new(Duration::from_nanos(0), clock).unwrap_err();
        assert!(matches!(err, CacheError::InvalidTtl { .. }));
    }

    #[test]
    fn ttl_past_max_nanos_is_rejected() {
        let clock = FakeClock::new();
        let err =
            ExpireAfterWrite::new(Duration::from_nanos(MAX_TTL_NANOS + 1), clock).unwrap_err();
        assert!(matches!(err, CacheError::InvalidTtl { .. }));
    }

    #[test]
    fn expire_after_write_does_not_refresh_on_touch() {
        let clock = FakeClock::new();
        let policy: ExpireAfterWrite<FakeClock> =
            ExpireAfterWrite::new(Duration::from_nanos(100), clock.clone()).unwrap();
        let created = ExpiryPolicy::<(), ()>::create_timestamp(&policy, &(), &(), 0);
        assert_eq!(created, 100);
        clock.advance_nanos(50);
        let touched =
            ExpiryPolicy::<(), ()>::touch_timestamp(&policy, &(), &(), created, clock.now());
        assert_eq!(touched, created);
    }

    #[test]
    fn expire_after_access_refreshes_on_touch() {
        let clock = FakeClock::new();
        let policy: ExpireAfterAccess<FakeClock> =
            ExpireAfterAccess::new(Duration::from_nanos(100), clock.clone()).unwrap();
        let created = ExpiryPolicy::<(), ()>::create_timestamp(&policy, &(), &(), 0);
        clock.advance_nanos(50);
        let touched =
            ExpiryPolicy::<(), ()>::touch_timestamp(&policy, &(), &(), created, clock.now());
        assert_eq!(touched, 150);
    }

    #[test]
    fn should_discard_fires_once_now_reaches_expiry() {
        let clock = FakeClock::new();
        let policy: ExpireAfterWrite<FakeClock> =
            ExpireAfterWrite::new(Duration::from_nanos(100), clock.clone()).unwrap();
        assert!(!ExpiryPolicy::<(), ()>::should_discard(&policy, 100, 99));
        assert!(ExpiryPolicy::<(), ()>::should_discard(&policy, 100, 100));
    }

    #[test]
    fn never_expire_never_discards() {
        let policy = NeverExpire;
        assert!(!ExpiryPolicy::<(), ()>::should_discard(&policy, NO_EXPIRY, u64::MAX));
        assert!(!ExpiryPolicy::<(), ()>::can_discard(&policy));
    }

    #[test]
    fn combining_after_write_and_after_access_is_rejected() {
        let clock = FakeClock::new();
        let err = combined::<(), (), _>(
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(1)),
            clock,
        )
        .unwrap_err();
        assert!(matches!(err, CacheError::MisconfiguredPolicy { .. }));
    }

    #[test]
    fn combined_with_only_after_write_set_builds_that_policy() {
        let clock = FakeClock::new();
        let policy =
            combined::<(), (), _>(Some(Duration::from_nanos(100)), None, clock.clone()).unwrap();
        let created = policy.create_timestamp(&(), &(), 0);
        assert_eq!(created, 100);
        clock.advance_nanos(50);
        assert_eq!(policy.touch_timestamp(&(), &(), created, clock.now()), created);
    }

    #[test]
    fn combined_with_neither_set_never_expires() {
        let clock = FakeClock::new();
        let policy = combined::<(), (), _>(None, None, clock).unwrap();
        assert!(!policy.can_discard());
    }
}
