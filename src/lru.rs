//! The three-segment (hot/warm/cold) LRU state machine: capacity arithmetic, the
//! maintenance pass, and the public operations the façade in `cache` delegates to.
//!
//! Grounded on the teacher's single-consumer drain loop
//! (`disruptor::mpsc::mpsc_consumer::MpscConsumer::drain`) for the maintenance pass
//! shape (drain buffers, then act), and on §4.5/§4.6 of the accompanying design
//! document for the routing and admission rules themselves, which have no teacher
//! counterpart.

use std::cell::Cell;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::admission::{self, AdmissionOutcome};
use crate::buffer::ring::RingBuffer;
use crate::buffer::write_buffer::{WriteBuffer, WriteOp};
use crate::constants::{
    COLD_SHARE, DEFAULT_READ_BUFFER_SIZE, HOT_SHARE, MAX_READ_BUFFER_STRIPES, WARM_SHARE,
};
use crate::expiry::ExpiryPolicy;
use crate::index::Index;
use crate::insights;
use crate::metrics::CacheMetrics;
use crate::node::{Node, SegmentTag};
use crate::segment::{route_cold, route_hot, route_warm, RouteOutcome, Segment};
use crate::sketch::FrequencySketch;

thread_local! {
    static STRIPE_HINT: Cell<usize> = Cell::new(usize::MAX);
}

fn stripe_for(stripe_count: usize) -> usize {
    STRIPE_HINT.with(|cell| {
        let mut hint = cell.get();
        if hint == usize::MAX || hint >= stripe_count {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            use std::hash::{Hash, Hasher};
            std::thread::current().id().hash(&mut hasher);
            hint = (hasher.finish() as usize) % stripe_count.max(1);
            cell.set(hint);
        }
        hint
    })
}

fn segment_capacities(total: usize) -> (usize, usize, usize) {
    let hot = ((total as f64) * HOT_SHARE).ceil() as usize;
    let cold = ((total as f64) * COLD_SHARE).ceil() as usize;
    let warm = total.saturating_sub(hot).saturating_sub(cold);
    debug_assert!(WARM_SHARE > 0.0);
    (hot.max(1), warm.max(1), cold.max(1))
}

struct Segments<K, V: Copy> {
    hot: Segment<K, V>,
    warm: Segment<K, V>,
    cold: Segment<K, V>,
    sketch: Option<FrequencySketch>,
}

pub struct LruCore<K, V, S = std::collections::hash_map::RandomState>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    index: Index<K, V, S>,
    segments: Mutex<Segments<K, V>>,
    read_buffers: Vec<RingBuffer<Arc<Node<K, V>>>>,
    write_buffer: WriteBuffer<Arc<Node<K, V>>>,
    expiry: Box<dyn ExpiryPolicy<K, V>>,
    metrics: CacheMetrics,
    capacity: usize,
}

impl<K, V> LruCore<K, V, std::collections::hash_map::RandomState>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    pub fn new(
        capacity: usize,
        frequency_aware: bool,
        expiry: Box<dyn ExpiryPolicy<K, V>>,
    ) -> Self {
        let (hot_cap, warm_cap, cold_cap) = segment_capacities(capacity);
        let stripes =
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(MAX_READ_BUFFER_STRIPES).max(1);
        let read_buffers =
            (0..stripes).map(|_| RingBuffer::new(DEFAULT_READ_BUFFER_SIZE)).collect();
        let sketch = if frequency_aware { Some(FrequencySketch::new(capacity.max(1))) } else { None };
        Self {
            index: Index::new(),
            segments: Mutex::new(Segments {
                hot: Segment::new(hot_cap),
                warm: Segment::new(warm_cap),
                cold: Segment::new(cold_cap),
                sketch,
            }),
            read_buffers,
            write_buffer: WriteBuffer::new(),
            expiry,
            metrics: CacheMetrics::new(),
            capacity: capacity.max(1),
        }
    }
}

impl<K, V, S> LruCore<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
    S: BuildHasher + Clone,
{
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn get(&self, key: &K, now: u64) -> Option<V> {
        let node = self.index.get(key)?;
        if node.was_removed() {
            self.metrics.record_miss();
            return None;
        }
        if self.expiry.should_discard(node.expire_at(), now) {
            self.metrics.record_miss();
            return None;
        }
        node.mark_accessed();
        let refreshed = self.expiry.touch_timestamp(key, &node.value(), node.expire_at(), now);
        node.set_expire_at(refreshed);
        self.metrics.record_hit();

        let stripe = stripe_for(self.read_buffers.len());
        if self.read_buffers[stripe].try_add(Arc::clone(&node))
            == crate::buffer::ring::RingOutcome::Full
        {
            insights::record_buffer_watermark(stripe);
            self.try_run_maintenance(now);
        }
        Some(node.value())
    }

    /// Inserts a brand-new entry. Callers are responsible for checking absence first
    /// (the façade's `GetOrAdd`/`AddOrUpdate` do so under the index's per-shard lock).
    pub fn insert(&self, key: K, value: V, now: u64) {
        let expire_at = self.expiry.create_timestamp(&key, &value, now);
        let node = Arc::new(Node::new(key.clone(), value, SegmentTag::Hot));
        node.set_expire_at(expire_at);
        self.index.insert(key, Arc::clone(&node));
        self.write_buffer.push(node, WriteOp::Add);
        self.try_run_maintenance(now);
    }

    pub fn update(&self, key: &K, value: V, now: u64) -> bool {
        let Some(node) = self.index.get(key) else { return false };
        if node.was_removed() {
            return false;
        }
        node.set_value(value);
        let refreshed = self.expiry.update_timestamp(key, &value, node.expire_at(), now);
        node.set_expire_at(refreshed);
        self.write_buffer.push(Arc::clone(&node), WriteOp::Update);
        self.try_run_maintenance(now);
        true
    }

    pub fn remove(&self, key: &K, now: u64) -> bool {
        let Some(node) = self.index.remove(key) else { return false };
        node.mark_removed();
        self.write_buffer.push(node, WriteOp::Remove);
        self.try_run_maintenance(now);
        true
    }

    pub fn clear(&self) {
        self.index.clear();
        let mut segments = self.segments.lock();
        segments.hot = Segment::new(segments.hot.capacity());
        segments.warm = Segment::new(segments.warm.capacity());
        segments.cold = Segment::new(segments.cold.capacity());
        if let Some(sketch) = segments.sketch.as_mut() {
            sketch.clear();
        }
        for buffer in &self.read_buffers {
            let mut drained = Vec::new();
            buffer.drain_to(&mut drained, buffer.capacity());
        }
        self.write_buffer.drain();
    }

    /// Attempts one maintenance pass; returns whether this call actually ran it (a
    /// concurrent caller may already hold the gate, in which case this skips).
    pub fn try_run_maintenance(&self, now: u64) -> bool {
        let Some(mut segments) = self.segments.try_lock() else { return false };
        insights::record_maintenance_start();
        self.drain_read_buffers(&mut segments);
        self.drain_write_buffer(&mut segments);
        self.fix_overflow(&mut segments);
        true
    }

    fn drain_read_buffers(&self, segments: &mut Segments<K, V>) {
        let mut scratch = Vec::with_capacity(DEFAULT_READ_BUFFER_SIZE);
        for buffer in &self.read_buffers {
            scratch.clear();
            buffer.drain_to(&mut scratch, DEFAULT_READ_BUFFER_SIZE);
            for node in scratch.drain(..) {
                self.apply_access(segments, node);
            }
        }
    }

    fn apply_access(&self, segments: &mut Segments<K, V>, node: Arc<Node<K, V>>) {
        if node.was_removed() {
            return;
        }
        if let Some(sketch) = segments.sketch.as_mut() {
            sketch.increment(&node.key);
        }
        match node.segment() {
            SegmentTag::Warm => {
                if node.was_accessed() && segments.warm.remove(&node) {
                    node.clear_accessed();
                    segments.warm.push_back(node);
                    insights::record_route("warm", "warm");
                }
            }
            SegmentTag::Cold => {
                if node.was_accessed() && segments.cold.remove(&node) {
                    node.clear_accessed();
                    node.set_segment(SegmentTag::Warm);
                    segments.warm.push_back(node);
                    insights::record_route("cold", "warm");
                    self.metrics.record_promotion();
                }
            }
            SegmentTag::Hot | SegmentTag::PendingRemove => {}
        }
    }

    fn drain_write_buffer(&self, segments: &mut Segments<K, V>) {
        for event in self.write_buffer.drain() {
            match event.op {
                WriteOp::Add => {
                    segments.hot.push_back(event.node);
                }
                WriteOp::Update => {}
                WriteOp::Remove => {
                    let removed = match event.node.segment() {
                        SegmentTag::Hot => segments.hot.remove(&event.node),
                        SegmentTag::Warm => segments.warm.remove(&event.node),
                        SegmentTag::Cold => segments.cold.remove(&event.node),
                        SegmentTag::PendingRemove => true,
                    };
                    let _ = removed;
                    event.node.set_segment(SegmentTag::PendingRemove);
                }
            }
        }
    }

    fn fix_overflow(&self, segments: &mut Segments<K, V>) {
        let hot_scan_bound = segments.hot.len() + 1;
        for _ in 0..hot_scan_bound {
            if !segments.hot.is_over_capacity() {
                break;
            }
            let Some(node) = segments.hot.pop_front() else { break };
            match route_hot::<K, V>(&node) {
                RouteOutcome::ToWarm => {
                    node.clear_accessed();
                    node.set_segment(SegmentTag::Warm);
                    segments.warm.push_back(node);
                }
                RouteOutcome::ToCold => {
                    node.clear_accessed();
                    self.admit_to_cold(segments, node);
                }
                RouteOutcome::Remove => unreachable!("RouteHot never evicts directly"),
            }
        }

        let warm_scan_bound = segments.warm.len() + 1;
        for _ in 0..warm_scan_bound {
            if !segments.warm.is_over_capacity() {
                break;
            }
            let Some(node) = segments.warm.pop_front() else { break };
            match route_warm::<K, V>(&node) {
                RouteOutcome::ToWarm => {
                    node.clear_accessed();
                    segments.warm.push_back(node);
                }
                RouteOutcome::ToCold => {
                    node.clear_accessed();
                    self.admit_to_cold(segments, node);
                }
                RouteOutcome::Remove => unreachable!("RouteWarm never evicts directly"),
            }
        }

        let cold_scan_bound = segments.cold.len() + 1;
        for _ in 0..cold_scan_bound {
            if !segments.cold.is_over_capacity() {
                break;
            }
            let Some(node) = segments.cold.pop_front() else { break };
            match route_cold::<K, V>(&node) {
                RouteOutcome::ToWarm => {
                    node.clear_accessed();
                    node.set_segment(SegmentTag::Warm);
                    segments.warm.push_back(node);
                }
                RouteOutcome::Remove => self.evict(&node),
                RouteOutcome::ToCold => unreachable!("RouteCold never re-circulates to Cold"),
            }
        }
    }

    /// Routes a Hot/Warm demotion candidate into Cold, consulting the sketch when
    /// frequency-aware admission is enabled and Cold is already full.
    fn admit_to_cold(&self, segments: &mut Segments<K, V>, candidate: Arc<Node<K, V>>) {
        if segments.cold.is_over_capacity() || segments.cold.len() >= segments.cold.capacity() {
            if let Some(sketch) = segments.sketch.as_ref() {
                if let Some(victim) = segments.cold.pop_front() {
                    match admission::admit(sketch, &candidate.key, &victim.key) {
                        AdmissionOutcome::AdmitCandidate => {
                            self.evict(&victim);
                            candidate.set_segment(SegmentTag::Cold);
                            segments.cold.push_back(candidate);
                        }
                        AdmissionOutcome::KeepIncumbent => {
                            segments.cold.push_back(victim);
                            self.evict(&candidate);
                        }
                    }
                    return;
                }
            }
        }
        candidate.set_segment(SegmentTag::Cold);
        segments.cold.push_back(candidate);
    }

    fn evict(&self, node: &Arc<Node<K, V>>) {
        node.mark_removed();
        self.index.remove(&node.key);
        self.metrics.record_eviction();
        insights::record_eviction("cold");
    }

    /// Runs maintenance, then walks every segment discarding items whose expiry
    /// policy says to drop them. Best-effort: a single pass is not guaranteed to
    /// catch every expired item under concurrent access; callers needing a strict
    /// bound should call repeatedly until `Count` stops dropping.
    pub fn trim_expired(&self, now: u64) {
        self.try_run_maintenance(now);
        if !self.expiry.can_discard() {
            return;
        }
        let Some(mut segments) = self.segments.try_lock() else { return };
        let segments = &mut *segments;
        for seg in [&mut segments.hot, &mut segments.warm, &mut segments.cold] {
            let expired: Vec<_> = (0..seg.len())
                .filter_map(|_| {
                    let node = seg.pop_front()?;
                    if self.expiry.should_discard(node.expire_at(), now) {
                        Some(node)
                    } else {
                        seg.push_back(Arc::clone(&node));
                        None
                    }
                })
                .collect();
            for node in expired {
                node.mark_removed();
                self.index.remove(&node.key);
                self.metrics.record_expiration();
                insights::record_eviction("expired");
            }
        }
    }

    /// Runs maintenance, then removes up to `n` items starting from the Cold head.
    pub fn trim(&self, n: usize, now: u64) -> usize {
        self.try_run_maintenance(now);
        let Some(mut segments) = self.segments.try_lock() else { return 0 };
        let mut removed = 0;
        while removed < n {
            let Some(node) = segments.cold.pop_front() else { break };
            self.evict(&node);
            removed += 1;
        }
        removed
    }
}
