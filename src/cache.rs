//! The public façade: `Cache<K, V, S>`. A thin collaborator over `LruCore` that makes
//! §6's operations callable; it holds no eviction logic of its own.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::expiry::{self, Clock, ExpiryPolicy, NeverExpire, SystemClock};
use crate::lru::LruCore;
use crate::metrics::MetricsSnapshot;

pub struct Cache<K, V, S = RandomState>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    core: LruCore<K, V, S>,
    clock: Arc<dyn Clock>,
}

impl<K, V, S> std::fmt::Debug for Cache<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

impl<K, V> Cache<K, V, RandomState>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    /// A plain LRU cache (no frequency-aware admission, no expiration).
    pub fn new(capacity: usize) -> Result<Self> {
        Self::build(capacity, false, Box::new(NeverExpire), Arc::new(SystemClock::new()))
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(capacity)
    }

    /// A cache with TinyLFU frequency-aware admission enabled.
    pub fn frequency_aware(capacity: usize) -> Result<Self> {
        Self::build(capacity, true, Box::new(NeverExpire), Arc::new(SystemClock::new()))
    }

    /// A cache with a caller-supplied expiry policy and clock, e.g.
    /// `ExpireAfterWrite`/`ExpireAfterAccess` paired with a `FakeClock` in tests.
    pub fn with_expiry<C>(
        capacity: usize,
        frequency_aware: bool,
        policy: Box<dyn ExpiryPolicy<K, V>>,
        clock: C,
    ) -> Result<Self>
    where
        C: Clock + 'static,
    {
        Self::build(capacity, frequency_aware, policy, Arc::new(clock))
    }

    /// A cache expiring after a write TTL, an access TTL, or neither — never both.
    /// Combining the two is rejected at construction (`CacheError::MisconfiguredPolicy`).
    pub fn with_ttl<C>(
        capacity: usize,
        frequency_aware: bool,
        after_write: Option<Duration>,
        after_access: Option<Duration>,
        clock: C,
    ) -> Result<Self>
    where
        C: Clock + Clone + 'static,
    {
        let policy = expiry::combined(after_write, after_access, clock.clone())?;
        Self::build(capacity, frequency_aware, policy, Arc::new(clock))
    }

    fn build(
        capacity: usize,
        frequency_aware: bool,
        policy: Box<dyn ExpiryPolicy<K, V>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::invalid_capacity("capacity must be greater than zero"));
        }
        Ok(Self { core: LruCore::new(capacity, frequency_aware, policy), clock })
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
    S: BuildHasher + Clone,
{
    fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn try_get(&self, key: &K) -> Option<V> {
        self.core.get(key, self.now())
    }

    /// At-most-once is not guaranteed under concurrent misses on the same key (see
    /// the Non-goal on strong consistency for concurrent writers); two threads
    /// racing a miss may both invoke `factory`, with the later insert winning.
    pub fn get_or_add(&self, key: &K, factory: impl FnOnce() -> V) -> V {
        if let Some(value) = self.try_get(key) {
            return value;
        }
        let value = factory();
        self.core.insert(key.clone(), value, self.now());
        value
    }

    pub fn add_or_update(&self, key: K, value: V) {
        let now = self.now();
        if self.core.update(&key, value, now) {
            return;
        }
        self.core.insert(key, value, now);
    }

    pub fn try_update(&self, key: &K, value: V) -> bool {
        self.core.update(key, value, self.now())
    }

    pub fn try_remove(&self, key: &K) -> bool {
        self.core.remove(key, self.now())
    }

    pub fn clear(&self) {
        self.core.clear();
    }

    pub fn count(&self) -> usize {
        self.core.count()
    }

    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Returns whether this call actually ran the pass; a concurrent maintenance
    /// pass already in progress causes this call to skip rather than wait.
    pub fn do_maintenance(&self) -> bool {
        self.core.try_run_maintenance(self.now())
    }

    /// Best-effort: see `LruCore::trim_expired` for why a single pass is not a
    /// strict bound under concurrent access.
    pub fn trim_expired(&self) {
        self.core.trim_expired(self.now());
    }

    pub fn trim(&self, n: usize) -> usize {
        self.core.trim(n, self.now())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics().snapshot()
    }
}
