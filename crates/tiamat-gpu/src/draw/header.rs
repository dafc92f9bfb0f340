//! Per-draw state header layout.
//!
//! Each committed draw carries one header record in the state ring; the host
//! binds the batch's header range as a structured buffer addressed by draw
//! index. Layout (byte offsets are part of the shader-visible contract):
//!
//! ```text
//! [param_gen: i32][float consts][bool consts][loop consts]
//! ```

use crate::regs::{RegisterFile, BOOL_WINDOW_BYTES, FLOAT_WINDOW_BYTES, LOOP_WINDOW_BYTES};
use crate::ring::{RingAllocation, RingBuffer};

/// Sentinel meaning "no parameter-generation register allocated".
pub const PARAM_GEN_NONE: i32 = -1;

pub const PARAM_GEN_OFFSET: usize = 0;
pub const FLOAT_CONSTS_OFFSET: usize = PARAM_GEN_OFFSET + 4;
pub const BOOL_CONSTS_OFFSET: usize = FLOAT_CONSTS_OFFSET + FLOAT_WINDOW_BYTES;
pub const LOOP_CONSTS_OFFSET: usize = BOOL_CONSTS_OFFSET + BOOL_WINDOW_BYTES;

/// Total header record size; the state-ring stride before ring alignment.
pub const STATE_HEADER_BYTES: usize = LOOP_CONSTS_OFFSET + LOOP_WINDOW_BYTES;

pub(crate) fn write_param_gen(ring: &mut RingBuffer, alloc: &RingAllocation, value: i32) {
    ring.write(alloc, PARAM_GEN_OFFSET as u64, &value.to_le_bytes());
}

/// Copies the three constant windows verbatim into a header record.
///
/// Always a full fixed-size copy; partial/delta uploads are deliberately not
/// attempted. Must complete before the state allocation is committed.
pub(crate) fn snapshot_constants(
    ring: &mut RingBuffer,
    alloc: &RingAllocation,
    regs: &RegisterFile,
) {
    ring.write(alloc, FLOAT_CONSTS_OFFSET as u64, regs.float_window());
    ring.write(alloc, BOOL_CONSTS_OFFSET as u64, regs.bool_window());
    ring.write(alloc, LOOP_CONSTS_OFFSET as u64, regs.loop_window());
}
