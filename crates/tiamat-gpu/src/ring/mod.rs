//! Ring (circular) byte arenas.
//!
//! Responsibilities:
//! - fixed-capacity, fixed-alignment allocation with acquire/commit/discard
//! - flush delivery of committed spans to a visibility sink (the host upload)
//!
//! The batcher treats ring memory as write-only: all writes go through
//! [`RingBuffer::write`], never through aliased pointers.

mod buffer;

pub use buffer::{RingAllocation, RingBuffer};
