//! Host rendering API seam.
//!
//! The batcher emits exactly three draw shapes: a single non-indexed draw, a
//! single indexed draw, and a multi-draw-indirect over fixed-stride command
//! records. Everything host-specific (buffers, passes, pipelines, capture
//! objects) lives behind [`HostApi`].
//!
//! Two implementations ship with the crate:
//! - [`RecordingHost`]: headless, records every call; used by the engine
//!   tests and by embedders for replay.
//! - [`WgpuHost`]: wgpu-backed submission (no capture support).

mod device;
mod recording;

pub use device::{wgpu_topology, WgpuHost, WgpuHostConfig};
pub use recording::{HostCall, RecordingHost};

use anyhow::Result;

use crate::draw::{CaptureBucket, DrawCommand, HostTopology, IndexFormat};

/// Which engine ring a visibility flush targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RingKind {
    /// Indirect draw records.
    Command,
    /// Per-draw state headers (constant snapshots).
    DrawState,
    /// Guest vertex/index stream data, uploaded by collaborators.
    VertexData,
}

/// Host rendering API consumed by the draw batcher.
///
/// All methods are synchronous; the only one allowed to block is
/// [`end_capture`], which waits for query availability.
///
/// [`end_capture`]: HostApi::end_capture
pub trait HostApi {
    /// Makes a committed ring span visible to subsequent host-side reads.
    fn flush_ring(&mut self, ring: RingKind, offset: u64, bytes: &[u8]);

    /// Binds the batch's header range as the per-draw constant source,
    /// addressed by draw index in a shader-visible structured binding.
    fn bind_draw_state(&mut self, offset: u64, length: u64);

    /// Issues one direct draw from decoded fields.
    ///
    /// `index_format` is present iff `command` is indexed.
    fn draw_single(
        &mut self,
        topology: HostTopology,
        command: &DrawCommand,
        index_format: Option<IndexFormat>,
    );

    /// Issues one multi-draw-indirect call reading `draw_count` records of
    /// `command_stride` spacing starting at `command_offset` in the command
    /// ring.
    fn draw_multi_indirect(
        &mut self,
        topology: HostTopology,
        index_format: Option<IndexFormat>,
        command_offset: u64,
        draw_count: u32,
        command_stride: u32,
    );

    /// Creates the capture buffer and primitive-count query.
    fn init_capture(&mut self, capacity: u64) -> Result<()>;

    /// Starts redirecting vertex output, keyed on the bucket topology.
    fn begin_capture(&mut self, bucket: CaptureBucket);

    /// Stops capturing and returns the assembled-primitive count.
    ///
    /// Blocks until the query result is available.
    fn end_capture(&mut self) -> u32;

    /// Copies captured bytes at `offset` into `dst`.
    fn read_capture(&mut self, offset: u64, dst: &mut [u8]) -> Result<()>;
}
