//! Padded atomics and the striped long-adder built on top of them.

pub mod long_adder;
pub mod padded;

pub use long_adder::LongAdder;
pub use padded::{PaddedAtomicI64, PaddedAtomicU64, PaddedHeadAndTail};
