//! Striped contention-avoiding sum counter.
//!
//! The CAS-retry-then-grow shape mirrors the teacher's `MpscRingBuffer::try_claim`
//! (`disruptor::mpsc::mpsc_ring_buffer`): optimistic `compare_exchange_weak` on the hot
//! path, `spin_loop` hint on failure, with the twist that repeated failure here grows
//! the stripe table instead of retrying the same slot forever.

use std::cell::Cell;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use crate::bitops::ceil_pow2;
use crate::counters::padded::PaddedAtomicI64;

thread_local! {
    static PROBE: Cell<u32> = Cell::new(0);
}

fn current_probe() -> u32 {
    PROBE.with(|p| {
        let v = p.get();
        if v != 0 {
            return v;
        }
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        let mut seed = hasher.finish() as u32;
        if seed == 0 {
            seed = 0x9e37_79b9;
        }
        p.set(seed);
        seed
    })
}

/// Re-hash this thread's probe after a collision, xor-shift style.
fn rehash_probe() -> u32 {
    PROBE.with(|p| {
        let mut v = p.get();
        v ^= v << 13;
        v ^= v >> 17;
        v ^= v << 5;
        if v == 0 {
            v = 0x9e37_79b9;
        }
        p.set(v);
        v
    })
}

/// A striped, contention-avoiding counter. `Sum` is an approximate snapshot, not
/// linearizable across concurrent increments on different stripes, but it never
/// reports a negative total.
pub struct LongAdder {
    base: AtomicI64,
    cells: RwLock<Vec<PaddedAtomicI64>>,
    cap: usize,
}

impl LongAdder {
    pub fn new() -> Self {
        let cap = ceil_pow2(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
        Self {
            base: AtomicI64::new(0),
            cells: RwLock::new(Vec::new()),
            cap,
        }
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn decrement(&self) {
        self.add(-1);
    }

    pub fn add(&self, delta: i64) {
        // Fast path: no contention yet, everyone fights over `base`.
        {
            let cells = self.cells.read();
            if cells.is_empty() {
                drop(cells);
                let cur = self.base.load(Ordering::Relaxed);
                if self
                    .base
                    .compare_exchange_weak(cur, cur + delta, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    return;
                }
                self.add_via_cells(delta);
                return;
            }
        }
        self.add_via_cells(delta);
    }

    fn add_via_cells(&self, delta: i64) {
        let mut probe = current_probe();
        loop {
            let cells = self.cells.read();
            let len = cells.len();
            if len == 0 {
                drop(cells);
                self.grow(1);
                probe = rehash_probe();
                continue;
            }
            let idx = (probe as usize) & (len - 1);
            let cur = cells[idx].load(Ordering::Relaxed);
            if cells[idx]
                .compare_exchange_weak(cur, cur + delta, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            if len >= self.cap {
                std::hint::spin_loop();
                probe = rehash_probe();
                continue;
            }
            drop(cells);
            self.grow(len);
            probe = rehash_probe();
        }
    }

    fn grow(&self, observed_len: usize) {
        let mut cells = self.cells.write();
        if cells.len() != observed_len {
            // Someone else already grew it; nothing to do.
            return;
        }
        let new_len = if cells.is_empty() { 1 } else { (cells.len() * 2).min(self.cap) };
        if new_len <= cells.len() {
            return;
        }
        let mut grown: Vec<PaddedAtomicI64> = Vec::with_capacity(new_len);
        for old in cells.drain(..) {
            grown.push(old);
        }
        while grown.len() < new_len {
            grown.push(PaddedAtomicI64::new(0));
        }
        *cells = grown;
    }

    /// Approximate snapshot sum; reads `base` plus every stripe without fencing
    /// between them. Never negative even if transient skew would otherwise produce
    /// a negative total.
    pub fn sum(&self) -> u64 {
        let mut total = self.base.load(Ordering::Relaxed);
        for cell in self.cells.read().iter() {
            total += cell.load(Ordering::Relaxed);
        }
        total.max(0) as u64
    }

    pub fn reset(&self) {
        self.base.store(0, Ordering::Relaxed);
        for cell in self.cells.read().iter() {
            cell.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for LongAdder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_at_zero() {
        let adder = LongAdder::new();
        assert_eq!(adder.sum(), 0);
    }

    #[test]
    fn sequential_increments_are_exact() {
        let adder = LongAdder::new();
        for _ in 0..1000 {
            adder.increment();
        }
        assert_eq!(adder.sum(), 1000);
    }

    #[test]
    fn decrement_reduces_sum() {
        let adder = LongAdder::new();
        adder.add(10);
        adder.decrement();
        assert_eq!(adder.sum(), 9);
    }

    #[test]
    fn reset_clears_all_stripes() {
        let adder = LongAdder::new();
        for _ in 0..50 {
            adder.increment();
        }
        adder.reset();
        assert_eq!(adder.sum(), 0);
    }

    #[test]
    fn four_threads_ten_thousand_increments_converge() {
        let adder = Arc::new(LongAdder::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let adder = Arc::clone(&adder);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        adder.increment();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(adder.sum(), 40_000);
    }
}
