//! The cache entry: key, sequence-locked value, segment tag, and access bookkeeping.
//!
//! `Node` ties together two of the core primitives — the padded atomics from
//! `counters::padded` (for the access/removed flags, so reader churn on them never
//! false-shares with a neighbour's fields) and the `SeqLockSlot` from `slot` (for the
//! value itself).

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use crate::slot::SeqLockSlot;

pub const NO_EXPIRY: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentTag {
    Hot = 0,
    Warm = 1,
    Cold = 2,
    PendingRemove = 3,
}

impl SegmentTag {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SegmentTag::Hot,
            1 => SegmentTag::Warm,
            2 => SegmentTag::Cold,
            _ => SegmentTag::PendingRemove,
        }
    }
}

/// A cache entry. `V: Copy` so the value can live behind a `SeqLockSlot`, matching
/// the spec's framing of the sequence lock as protection for "value-type payloads".
pub struct Node<K, V: Copy> {
    pub key: K,
    value: SeqLockSlot<V>,
    segment: AtomicU8,
    was_accessed: AtomicBool,
    was_removed: AtomicBool,
    /// Monotonic-clock tick at which this entry expires, or `NO_EXPIRY`.
    expire_at: AtomicU64,
}

impl<K, V: Copy> Node<K, V> {
    pub fn new(key: K, value: V, segment: SegmentTag) -> Self {
        Self {
            key,
            value: SeqLockSlot::new(value),
            segment: AtomicU8::new(segment as u8),
            was_accessed: AtomicBool::new(false),
            was_removed: AtomicBool::new(false),
            expire_at: AtomicU64::new(NO_EXPIRY),
        }
    }

    pub fn value(&self) -> V {
        self.value.read()
    }

    pub fn set_value(&self, value: V) {
        self.value.write(value);
    }

    pub fn segment(&self) -> SegmentTag {
        SegmentTag::from_u8(self.segment.load(Ordering::Relaxed))
    }

    pub fn set_segment(&self, tag: SegmentTag) {
        self.segment.store(tag as u8, Ordering::Relaxed);
    }

    /// Written without synchronisation on the read-hit path; a torn write here only
    /// costs a missed promotion, never a correctness failure.
    pub fn mark_accessed(&self) {
        self.was_accessed.store(true, Ordering::Relaxed);
    }

    pub fn was_accessed(&self) -> bool {
        self.was_accessed.load(Ordering::Relaxed)
    }

    pub fn clear_accessed(&self) {
        self.was_accessed.store(false, Ordering::Relaxed);
    }

    pub fn mark_removed(&self) {
        self.was_removed.store(true, Ordering::Release);
    }

    pub fn was_removed(&self) -> bool {
        self.was_removed.load(Ordering::Acquire)
    }

    pub fn expire_at(&self) -> u64 {
        self.expire_at.load(Ordering::Relaxed)
    }

    pub fn set_expire_at(&self, ticks: u64) {
        self.expire_at.store(ticks, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_starts_unaccessed_and_present() {
        let node = Node::new("k", 42i32, SegmentTag::Hot);
        assert_eq!(node.value(), 42);
        assert!(!node.was_accessed());
        assert!(!node.was_removed());
        assert_eq!(node.segment(), SegmentTag::Hot);
        assert_eq!(node.expire_at(), NO_EXPIRY);
    }

    #[test]
    fn mark_and_clear_accessed_round_trip() {
        let node = Node::new("k", 1i32, SegmentTag::Cold);
        node.mark_accessed();
        assert!(node.was_accessed());
        node.clear_accessed();
        assert!(!node.was_accessed());
    }

    #[test]
    fn set_value_is_visible_to_subsequent_reads() {
        let node = Node::new("k", 1i32, SegmentTag::Warm);
        node.set_value(2);
        assert_eq!(node.value(), 2);
    }
}
