//! Hot/Warm/Cold FIFO segments and their routing decisions.
//!
//! Segments are exclusively mutated by the maintenance thread (see `lru`), so a plain
//! `VecDeque` is enough — no lock, no atomics, matching the rule that "readers never
//! traverse segment lists". Grounded on the teacher's preference for a single owner
//! thread draining shared state (`disruptor::mpsc::mpsc_consumer::MpscConsumer`), here
//! applied to three queues instead of one.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::node::{Node, SegmentTag};

/// What maintenance should do with a Node that just fell off the head of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    ToWarm,
    ToCold,
    Remove,
}

pub struct Segment<K, V: Copy> {
    queue: VecDeque<Arc<Node<K, V>>>,
    capacity: usize,
}

impl<K, V: Copy> Segment<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self { queue: VecDeque::new(), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_over_capacity(&self) -> bool {
        self.queue.len() > self.capacity
    }

    pub fn push_back(&mut self, node: Arc<Node<K, V>>) {
        self.queue.push_back(node);
    }

    pub fn pop_front(&mut self) -> Option<Arc<Node<K, V>>> {
        self.queue.pop_front()
    }

    /// Remove a specific node from anywhere in the segment (used when maintenance
    /// promotes a node that is not at the head, e.g. a Warm re-circulation).
    pub fn remove(&mut self, node: &Arc<Node<K, V>>) -> bool {
        if let Some(idx) = self.queue.iter().position(|n| Arc::ptr_eq(n, node)) {
            self.queue.remove(idx);
            true
        } else {
            false
        }
    }
}

/// `RouteHot`: accessed Nodes are promoted to Warm, everything else falls to Cold.
pub fn route_hot<K, V: Copy>(node: &Node<K, V>) -> RouteOutcome {
    if node.was_accessed() {
        RouteOutcome::ToWarm
    } else {
        RouteOutcome::ToCold
    }
}

/// `RouteWarm`: accessed Nodes re-circulate to the Warm tail, everything else demotes
/// to Cold.
pub fn route_warm<K, V: Copy>(node: &Node<K, V>) -> RouteOutcome {
    if node.was_accessed() {
        RouteOutcome::ToWarm
    } else {
        RouteOutcome::ToCold
    }
}

/// `RouteCold`: accessed Nodes are rescued to Warm, everything else is evicted.
pub fn route_cold<K, V: Copy>(node: &Node<K, V>) -> RouteOutcome {
    if node.was_accessed() {
        RouteOutcome::ToWarm
    } else {
        RouteOutcome::Remove
    }
}
