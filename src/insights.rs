//! Insights - observability for the cache core.
//!
//! Unified tracing hooks for maintenance cycles, segment routing, and sketch resets.
//! Zero-cost when the `tracing` feature is disabled.
//!
//! # Usage
//!
//! ```toml
//! concache = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! concache::insights::init_tracing();
//! ```

/// Install a `fmt` subscriber so the hooks in this module actually print somewhere.
/// Only present when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::prelude::*;
    let _ = tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).try_init();
}

/// Record the start of a maintenance pass (creates a span when tracing is enabled).
#[cfg(feature = "tracing")]
#[inline]
pub fn record_maintenance_start() {
    let _span = tracing::trace_span!("maintenance").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_maintenance_start() {}

/// Record a node being evicted from a given segment.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_eviction(segment: &str) {
    tracing::debug!(segment, "evicted");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_eviction(_segment: &str) {}

/// Record a promotion/demotion move between segments.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_route(from: &str, to: &str) {
    tracing::trace!(from, to, "routed");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_route(_from: &str, _to: &str) {}

/// Record a frequency-sketch reset (aging pass).
#[cfg(feature = "tracing")]
#[inline]
pub fn record_sketch_reset(size_before: u64) {
    tracing::debug!(size_before, "sketch reset");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_sketch_reset(_size_before: u64) {}

/// Record a read-buffer stripe filling up and triggering maintenance.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_buffer_watermark(stripe: usize) {
    tracing::trace!(stripe, "read buffer watermark reached");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_buffer_watermark(_stripe: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_compile_and_run_as_no_ops() {
        record_maintenance_start();
        record_eviction("cold");
        record_route("hot", "warm");
        record_sketch_reset(1024);
        record_buffer_watermark(0);
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn init_tracing_does_not_panic_when_called_twice() {
        init_tracing();
        init_tracing();
    }
}
