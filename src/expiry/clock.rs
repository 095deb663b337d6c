//! A pluggable monotonic tick source, following the split the original source makes
//! between a wall-clock-independent production clock and a deterministic test clock
//! (see `other_examples/`'s cache expiry tests in the reference pack, which advance a
//! fake clock rather than sleeping).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An opaque, monotonically non-decreasing tick count in nanoseconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Production clock: nanoseconds elapsed since this instance was constructed,
/// backed by `std::time::Instant` (guaranteed monotonic on every supported platform).
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        self.epoch.elapsed().as_nanos().min(u64::MAX as u128) as u64
    }
}

/// Deterministic clock for tests: callers advance it explicitly instead of sleeping.
#[derive(Clone)]
pub struct FakeClock {
    ticks: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { ticks: Arc::new(AtomicU64::new(0)) }
    }

    pub fn advance_nanos(&self, nanos: u64) {
        self.ticks.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_nanos(&self, nanos: u64) {
        self.ticks.store(nanos, Ordering::Relaxed);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_non_decreasing() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn fake_clock_advances_only_when_told() {
        let clock = FakeClock::new();
        assert_eq!(clock.now(), 0);
        clock.advance_nanos(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance_nanos(1_000);
        assert_eq!(clock.now(), 2_000);
    }

    #[test]
    fn fake_clock_clones_share_state() {
        let clock = FakeClock::new();
        let clone = clock.clone();
        clock.advance_nanos(500);
        assert_eq!(clone.now(), 500);
    }
}
