//! Cache-line padded atomics.
//!
//! Grounded on the teacher's `PaddedAtomicU64` (`disruptor::completion_tracker`), which
//! wraps a single `AtomicU64` in a `#[repr(align(128))]` struct to prevent false sharing
//! between cursors living on adjacent cache lines. Extended here with a two-field variant
//! for the ring buffer's head/tail pair, which must not share a line with each other.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// A single 64-bit atomic, padded out to a full cache line (128B covers both common
/// 64B and Apple Silicon's 128B line size).
#[repr(align(128))]
pub struct PaddedAtomicU64(AtomicU64);

impl PaddedAtomicU64 {
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> u64 {
        self.0.load(order)
    }

    #[inline]
    pub fn store(&self, value: u64, order: Ordering) {
        self.0.store(value, order)
    }

    #[inline]
    pub fn fetch_add(&self, delta: u64, order: Ordering) -> u64 {
        self.0.fetch_add(delta, order)
    }

    #[inline]
    pub fn compare_exchange_weak(
        &self,
        current: u64,
        new: u64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u64, u64> {
        self.0.compare_exchange_weak(current, new, success, failure)
    }
}

/// Head (consumer) and tail (producers) cursors for the bounded ring buffer, each on
/// its own cache line so producer CAS traffic on `tail` never invalidates the
/// consumer's line holding `head`, and vice versa.
#[repr(align(128))]
pub struct PaddedHeadAndTail {
    pub head: PaddedAtomicU64,
    pub tail: PaddedAtomicU64,
}

impl PaddedHeadAndTail {
    pub const fn new() -> Self {
        Self {
            head: PaddedAtomicU64::new(0),
            tail: PaddedAtomicU64::new(0),
        }
    }
}

impl Default for PaddedHeadAndTail {
    fn default() -> Self {
        Self::new()
    }
}

/// A signed 64-bit atomic cell, padded out to a full cache line. Used for the
/// striped adder's per-thread cells, where each cell must not false-share with
/// its neighbours under concurrent CAS traffic from unrelated threads.
#[repr(align(128))]
pub struct PaddedAtomicI64(AtomicI64);

impl PaddedAtomicI64 {
    pub const fn new(value: i64) -> Self {
        Self(AtomicI64::new(value))
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> i64 {
        self.0.load(order)
    }

    #[inline]
    pub fn store(&self, value: i64, order: Ordering) {
        self.0.store(value, order)
    }

    #[inline]
    pub fn compare_exchange_weak(
        &self,
        current: i64,
        new: i64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<i64, i64> {
        self.0.compare_exchange_weak(current, new, success, failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_atomic_is_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<PaddedAtomicU64>(), 128);
    }

    #[test]
    fn head_and_tail_are_independently_addressable() {
        let ht = PaddedHeadAndTail::new();
        assert_eq!(ht.head.load(Ordering::Relaxed), 0);
        assert_eq!(ht.tail.load(Ordering::Relaxed), 0);
        ht.tail.fetch_add(1, Ordering::Relaxed);
        assert_eq!(ht.head.load(Ordering::Relaxed), 0);
        assert_eq!(ht.tail.load(Ordering::Relaxed), 1);
    }
}
