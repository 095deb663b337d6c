//! Cache tuning constants.
//!
//! Core constants used by the segment router and the frequency sketch.

/// Default read-buffer length per stripe (must be a power of 2).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64;

/// Upper bound on the number of read-buffer stripes, regardless of CPU count.
pub const MAX_READ_BUFFER_STRIPES: usize = 64;

/// Hot segment share of total capacity.
pub const HOT_SHARE: f64 = 0.10;

/// Cold segment share of total capacity.
pub const COLD_SHARE: f64 = 0.10;

/// Warm segment share of total capacity (the remainder).
pub const WARM_SHARE: f64 = 1.0 - HOT_SHARE - COLD_SHARE;

/// Minimum sketch sample size, applied even for tiny capacities.
pub const MIN_SKETCH_SAMPLE_SIZE: u64 = 10;

/// Multiplier from capacity to sketch sample size (`sampleSize = 10 * capacity`).
pub const SKETCH_SAMPLE_MULTIPLIER: u64 = 10;

/// Saturation value for a single 4-bit frequency counter.
pub const SKETCH_COUNTER_MAX: u8 = 15;

/// Number of independent hash rows in the frequency sketch.
pub const SKETCH_ROWS: usize = 4;

/// Largest TTL (in nanoseconds) this crate will accept, matching the original's
/// `long.Max / 100` overflow guard scaled to a 1ns tick.
pub const MAX_TTL_NANOS: u64 = u64::MAX / 100;

/// Initial stripe count for a freshly constructed `LongAdder`.
pub const LONG_ADDER_INITIAL_STRIPES: usize = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_buffer_size_is_power_of_two() {
        assert!(DEFAULT_READ_BUFFER_SIZE.is_power_of_two());
    }

    #[test]
    fn segment_shares_sum_to_one() {
        assert!((HOT_SHARE + WARM_SHARE + COLD_SHARE - 1.0).abs() < 1e-9);
    }
}
