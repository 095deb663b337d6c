//! Bounded multi-producer / single-consumer ring buffer.
//!
//! Reservation (CAS on `tail`) is separated from publication (a per-slot state flag),
//! the same split the teacher's `MpscRingBuffer` uses so producers never block each
//! other (`disruptor::mpsc::mpsc_ring_buffer`). The teacher encodes publication as a
//! round-parity bit in a shared bitfield; this buffer instead gives each slot its own
//! tri-state flag (`Empty`/`Reserved`/`Published`), closer to the "null slot means
//! reserved-but-unpublished" wording used to specify this component.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::bitops::ceil_pow2;
use crate::counters::padded::PaddedHeadAndTail;

const SLOT_EMPTY: u8 = 0;
const SLOT_RESERVED: u8 = 1;
const SLOT_PUBLISHED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOutcome {
    Success,
    Full,
    Empty,
    Contended,
}

struct Slot<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(SLOT_EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

unsafe impl<T: Send> Sync for Slot<T> {}

/// A bounded MPSC ring buffer. Length is rounded up to a power of two.
pub struct RingBuffer<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    cursors: PaddedHeadAndTail,
}

impl<T> RingBuffer<T> {
    pub fn new(requested_len: usize) -> Self {
        let len = ceil_pow2(requested_len.max(1));
        let slots = (0..len).map(|_| Slot::new()).collect::<Vec<_>>().into_boxed_slice();
        Self { slots, mask: len - 1, cursors: PaddedHeadAndTail::new() }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Multi-producer: attempt to enqueue `item`.
    pub fn try_add(&self, item: T) -> RingOutcome {
        let tail = self.cursors.tail.load(Ordering::Relaxed);
        let head = self.cursors.head.load(Ordering::Acquire);
        let size = tail.wrapping_sub(head);
        if size >= self.slots.len() as u64 {
            return RingOutcome::Full;
        }
        match self.cursors.tail.compare_exchange_weak(
            tail,
            tail + 1,
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => {
                let idx = (tail as usize) & self.mask;
                let slot = &self.slots[idx];
                // SAFETY: this slot index cannot be claimed by another producer until
                // the consumer has advanced `head` past it, and the size check above
                // (using a head snapshot that is only ever stale-low) guarantees the
                // consumer has already vacated it.
                unsafe {
                    (*slot.value.get()).write(item);
                }
                slot.state.store(SLOT_PUBLISHED, Ordering::Release);
                RingOutcome::Success
            }
            Err(_) => RingOutcome::Contended,
        }
    }

    /// Single consumer: attempt to dequeue one item.
    pub fn try_take(&self) -> Result<T, RingOutcome> {
        let head = self.cursors.head.load(Ordering::Relaxed);
        let tail = self.cursors.tail.load(Ordering::Acquire);
        if head == tail {
            return Err(RingOutcome::Empty);
        }
        let idx = (head as usize) & self.mask;
        let slot = &self.slots[idx];
        if slot.state.load(Ordering::Acquire) != SLOT_PUBLISHED {
            return Err(RingOutcome::Contended);
        }
        // SAFETY: state was Published, so the producer finished writing; we are the
        // only consumer, so no one else will read or rewrite this slot concurrently.
        let item = unsafe { (*slot.value.get()).assume_init_read() };
        slot.state.store(SLOT_EMPTY, Ordering::Relaxed);
        self.cursors.head.store(head + 1, Ordering::Release);
        Ok(item)
    }

    /// Single consumer: drain up to `out.capacity() - out.len()` items (or until the
    /// buffer runs dry or a not-yet-published slot is observed), publishing the new
    /// head once at the end rather than per item.
    pub fn drain_to(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut head = self.cursors.head.load(Ordering::Relaxed);
        let tail = self.cursors.tail.load(Ordering::Acquire);
        let mut drained = 0usize;
        while head != tail && drained < max {
            let idx = (head as usize) & self.mask;
            let slot = &self.slots[idx];
            if slot.state.load(Ordering::Acquire) != SLOT_PUBLISHED {
                break;
            }
            let item = unsafe { (*slot.value.get()).assume_init_read() };
            slot.state.store(SLOT_EMPTY, Ordering::Relaxed);
            out.push(item);
            head += 1;
            drained += 1;
        }
        if drained > 0 {
            self.cursors.head.store(head, Ordering::Release);
        }
        drained
    }

    /// Not thread-safe: callers must hold exclusive access (e.g. during construction
    /// or a maintenance pass that owns the buffer outright).
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.state.load(Ordering::Relaxed) == SLOT_PUBLISHED {
                unsafe {
                    (*slot.value.get()).assume_init_drop();
                }
            }
            *slot.state.get_mut() = SLOT_EMPTY;
        }
        self.cursors.head.store(0, Ordering::Relaxed);
        self.cursors.tail.store(0, Ordering::Relaxed);
    }

    /// Snapshot count; may be stale the instant it is observed under concurrency.
    pub fn count(&self) -> u64 {
        let tail = self.cursors.tail.load(Ordering::Acquire);
        let head = self.cursors.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if *slot.state.get_mut() == SLOT_PUBLISHED {
                unsafe {
                    (*slot.value.get()).assume_init_drop();
                }
            }
        }
    }
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}
