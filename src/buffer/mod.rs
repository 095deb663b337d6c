//! MPSC buffers: the bounded read-hit ring and the unbounded write queue.

pub mod ring;
pub mod write_buffer;

pub use ring::{RingBuffer, RingOutcome};
pub use write_buffer::{WriteBuffer, WriteEvent, WriteOp};
