//! Unbounded multi-producer / single-consumer write buffer.
//!
//! Unlike the bounded read-buffer ring (`buffer::ring`), writes must never be dropped,
//! so this is a plain `parking_lot::Mutex`-guarded queue — the teacher keeps
//! `parking_lot` in its dependency stack for exactly this kind of short critical
//! section, reserving lock-free machinery for the truly hot read path.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// The kind of mutation a writer enqueued for maintenance to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Add,
    Update,
    Remove,
}

pub struct WriteEvent<T> {
    pub node: T,
    pub op: WriteOp,
}

pub struct WriteBuffer<T> {
    queue: Mutex<VecDeque<WriteEvent<T>>>,
}

impl<T> WriteBuffer<T> {
    pub fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()) }
    }

    pub fn push(&self, node: T, op: WriteOp) {
        self.queue.lock().push_back(WriteEvent { node, op });
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Single consumer: drain every pending event.
    pub fn drain(&self) -> Vec<WriteEvent<T>> {
        let mut queue = self.queue.lock();
        queue.drain(..).collect()
    }
}

impl<T> Default for WriteBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_drain_preserves_order() {
        let wb = WriteBuffer::new();
        wb.push(1, WriteOp::Add);
        wb.push(2, WriteOp::Update);
        wb.push(3, WriteOp::Remove);

        let drained = wb.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].node, 1);
        assert_eq!(drained[0].op, WriteOp::Add);
        assert_eq!(drained[2].op, WriteOp::Remove);
        assert!(wb.is_empty());
    }

    #[test]
    fn drain_on_empty_returns_empty_vec() {
        let wb: WriteBuffer<u32> = WriteBuffer::new();
        assert!(wb.drain().is_empty());
    }
}
