//! Sequence-locked value slot.
//!
//! Grounded on the teacher's `RingBufferCore::write_slot`/`read_slot`
//! (`disruptor::ring_buffer_core`), which already use `ptr::write_volatile`/
//! `ptr::read_volatile` to publish a slot value without a mutex. This module adds the
//! odd/even sequence counter around those volatile accesses so a value wider than a
//! machine word can be read torn-free by many readers while a single writer (the
//! maintenance thread, or a per-entry lock holder) mutates it.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Readers must loop: odd sequence means a writer is mid-flight.
#[inline]
fn is_writing(sequence: u64) -> bool {
    sequence & 1 == 1
}

/// A value protected by a sequence lock. Writers must already hold external mutual
/// exclusion (the cache routes all mutation for a key through the maintenance thread
/// or a per-entry lock); this type only protects readers from observing a torn value.
pub struct SeqLockSlot<T: Copy> {
    sequence: AtomicU64,
    value: UnsafeCell<T>,
}

impl<T: Copy> SeqLockSlot<T> {
    pub fn new(value: T) -> Self {
        Self { sequence: AtomicU64::new(0), value: UnsafeCell::new(value) }
    }

    /// Write a new value. Caller must guarantee no other writer is concurrently
    /// calling `write` on this slot.
    pub fn write(&self, value: T) {
        let seq = self.sequence.load(Ordering::Relaxed);
        self.sequence.store(seq.wrapping_add(1), Ordering::Release);
        // SAFETY: external mutual exclusion among writers; the odd sequence above
        // tells concurrent readers to retry rather than observe this half-written
        // state.
        unsafe {
            std::ptr::write_volatile(self.value.get(), value);
        }
        self.sequence.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Tearing-free read: spins only while a writer is mid-flight, which is bounded
    /// by the length of a single `write` call.
    pub fn read(&self) -> T {
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if is_writing(before) {
                std::hint::spin_loop();
                continue;
            }
            // SAFETY: no writer holds the slot between reading `before` and `after`
            // unless `before != after`, in which case the read is discarded below.
            let value = unsafe { std::ptr::read_volatile(self.value.get()) };
            let after = self.sequence.load(Ordering::Acquire);
            if before == after {
                return value;
            }
        }
    }
}

unsafe impl<T: Copy + Send> Send for SeqLockSlot<T> {}
unsafe impl<T: Copy + Send> Sync for SeqLockSlot<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    struct Wide {
        a: u64,
        b: u64,
        c: u64,
    }

    #[test]
    fn read_after_write_matches() {
        let slot = SeqLockSlot::new(Wide { a: 1, b: 2, c: 3 });
        assert_eq!(slot.read(), Wide { a: 1, b: 2, c: 3 });
        slot.write(Wide { a: 9, b: 9, c: 9 });
        assert_eq!(slot.read(), Wide { a: 9, b: 9, c: 9 });
    }

    #[test]
    fn concurrent_readers_never_observe_a_torn_or_unwritten_value() {
        let slot = Arc::new(SeqLockSlot::new(Wide { a: 0, b: 0, c: 0 }));
        let stop = Arc::new(AtomicBool::new(false));

        let writer = {
            let slot = Arc::clone(&slot);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                for i in 1..5000u64 {
                    slot.write(Wide { a: i, b: i, c: i });
                }
                stop.store(true, Ordering::Relaxed);
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let v = slot.read();
                        assert_eq!(v.a, v.b);
                        assert_eq!(v.b, v.c);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
