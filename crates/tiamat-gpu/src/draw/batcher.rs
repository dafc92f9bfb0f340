//! Batch state machine and flush orchestrator.

use anyhow::{bail, ensure, Context, Result};

use crate::host::{HostApi, RingKind};
use crate::regs::RegisterFile;
use crate::ring::{RingAllocation, RingBuffer};

use super::args::{DrawArraysArgs, DrawCommand, DrawElementsArgs, COMMAND_STRIDE};
use super::capture::{CaptureState, CAPTURE_BUFFER_CAPACITY};
use super::header;
use super::primitive::{IndexFormat, PrimitiveType};

pub const COMMAND_RING_CAPACITY: u64 = 16 * 1024 * 1024;
/// Indirect records only need 4-byte addressing.
pub const COMMAND_RING_ALIGNMENT: u64 = 4;
pub const STATE_RING_CAPACITY: u64 = 64 * 1024 * 1024;
/// Matches the host API's structured-buffer-offset binding granularity.
pub const STATE_RING_ALIGNMENT: u64 = 256;
pub const VERTEX_RING_CAPACITY: u64 = 32 * 1024 * 1024;
pub const VERTEX_RING_ALIGNMENT: u64 = 4;

/// Opaque pipeline handle, compared only by identity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineId(pub u64);

/// Opaque shader-stage handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderStageId(pub u64);

/// Why a batch is being ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FlushMode {
    /// Configuration changed; record strides are recomputed on the next
    /// begin.
    Reconfigure,
    /// Ending only to free ring capacity; configuration persists.
    MakeCoherent,
}

/// Construction parameters.
///
/// Ring capacities are configurable (tests shrink them to exercise
/// backpressure); alignments are part of the record-addressing contract and
/// are not.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub command_ring_capacity: u64,
    pub state_ring_capacity: u64,
    pub vertex_ring_capacity: u64,
    /// Whether to create vertex-capture resources and bracket every flushed
    /// draw with a capture pass.
    pub capture_enabled: bool,
    pub capture_capacity: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            command_ring_capacity: COMMAND_RING_CAPACITY,
            state_ring_capacity: STATE_RING_CAPACITY,
            vertex_ring_capacity: VERTEX_RING_CAPACITY,
            capture_enabled: false,
            capture_capacity: CAPTURE_BUFFER_CAPACITY,
        }
    }
}

/// Accumulated batch configuration and ranges.
///
/// Strides are fixed from the first draw after a reconfigure until the next
/// flush; every committed record in a batch shares them, which is what makes
/// indirect multi-draw addressing valid.
#[derive(Debug)]
struct BatchState {
    pipeline: Option<PipelineId>,
    vertex_shader: Option<ShaderStageId>,
    pixel_shader: Option<ShaderStageId>,
    prim_type: Option<PrimitiveType>,
    indexed: bool,
    index_format: Option<IndexFormat>,
    command_stride: u32,
    state_stride: u32,
    /// Set exactly once per batch, at the first commit after a flush.
    command_range_start: Option<u64>,
    command_range_length: u64,
    state_range_start: Option<u64>,
    state_range_length: u64,
    draw_count: u32,
    needs_reconfigure: bool,
}

impl BatchState {
    fn new() -> Self {
        Self {
            pipeline: None,
            vertex_shader: None,
            pixel_shader: None,
            prim_type: None,
            indexed: false,
            index_format: None,
            command_stride: 0,
            state_stride: 0,
            command_range_start: None,
            command_range_length: 0,
            state_range_start: None,
            state_range_length: 0,
            draw_count: 0,
            needs_reconfigure: true,
        }
    }
}

/// The single outstanding draw between a begin and its commit/discard.
#[derive(Debug)]
struct ActiveDraw {
    command_allocation: RingAllocation,
    state_allocation: RingAllocation,
    command: DrawCommand,
}

/// Accumulates guest draws into ring-resident indirect records and flushes
/// them as one (or few) host calls.
///
/// Single-threaded by design: every method must run on the thread owning the
/// host rendering context, and no method may reenter the batcher.
pub struct DrawBatcher<H: HostApi> {
    host: H,
    command_ring: RingBuffer,
    state_ring: RingBuffer,
    /// Guest stream data uploaded by collaborators; flushed here so a batch
    /// never draws from stale vertex bytes.
    vertex_ring: RingBuffer,
    batch: BatchState,
    active: Option<ActiveDraw>,
    /// Retained past commit for the single-draw fast path at flush.
    last_command: Option<DrawCommand>,
    capture: CaptureState,
}

impl<H: HostApi> DrawBatcher<H> {
    /// Creates the batcher and, when the config asks for it, the host's
    /// capture resources. A capture-object failure surfaces here.
    pub fn new(mut host: H, config: BatchConfig) -> Result<Self> {
        if config.capture_enabled {
            host.init_capture(config.capture_capacity)
                .context("failed to create vertex-capture resources")?;
        }
        Ok(Self {
            host,
            command_ring: RingBuffer::new(config.command_ring_capacity, COMMAND_RING_ALIGNMENT),
            state_ring: RingBuffer::new(config.state_ring_capacity, STATE_RING_ALIGNMENT),
            vertex_ring: RingBuffer::new(config.vertex_ring_capacity, VERTEX_RING_ALIGNMENT),
            batch: BatchState::new(),
            active: None,
            last_command: None,
            capture: CaptureState::new(config.capture_enabled),
        })
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Commits since the last flush.
    #[inline]
    pub fn draw_count(&self) -> u32 {
        self.batch.draw_count
    }

    #[inline]
    pub fn is_draw_open(&self) -> bool {
        self.active.is_some()
    }

    #[inline]
    pub fn pipeline(&self) -> Option<PipelineId> {
        self.batch.pipeline
    }

    #[inline]
    pub fn vertex_shader(&self) -> Option<ShaderStageId> {
        self.batch.vertex_shader
    }

    #[inline]
    pub fn pixel_shader(&self) -> Option<ShaderStageId> {
        self.batch.pixel_shader
    }

    #[inline]
    pub fn capture(&self) -> &CaptureState {
        &self.capture
    }

    /// The guest stream-data ring. Collaborators acquire/commit here; the
    /// batcher only flushes it.
    #[inline]
    pub fn vertex_ring_mut(&mut self) -> &mut RingBuffer {
        &mut self.vertex_ring
    }

    /// Byte size of the data captured by the previous flushed draw.
    #[inline]
    pub fn captured_byte_size(&self) -> u64 {
        self.capture.captured_byte_size()
    }

    /// Reads back captured vertex data. Fails when capture is disabled or
    /// the range reaches past the captured size.
    pub fn read_captured(&mut self, offset: u64, dst: &mut [u8]) -> Result<()> {
        self.capture.readback(&mut self.host, offset, dst)
    }

    /// Swaps the bound pipeline. A no-op for an identical handle; otherwise
    /// the accumulated batch is flushed first.
    pub fn reconfigure_pipeline(
        &mut self,
        vertex_shader: ShaderStageId,
        pixel_shader: ShaderStageId,
        pipeline: PipelineId,
    ) -> Result<()> {
        if self.batch.pipeline == Some(pipeline) {
            return Ok(());
        }
        self.flush(FlushMode::Reconfigure)?;

        self.batch.vertex_shader = Some(vertex_shader);
        self.batch.pixel_shader = Some(pixel_shader);
        self.batch.pipeline = Some(pipeline);
        Ok(())
    }

    /// Opens a non-indexed draw of `index_count` vertices.
    pub fn begin_draw_arrays(
        &mut self,
        regs: &RegisterFile,
        prim_type: PrimitiveType,
        index_count: u32,
    ) -> Result<()> {
        ensure!(self.active.is_none(), "a draw is already open");
        if self.batch.prim_type != Some(prim_type) || self.batch.indexed {
            self.flush(FlushMode::Reconfigure)?;
        }
        self.batch.prim_type = Some(prim_type);
        self.batch.indexed = false;
        self.batch.index_format = None;

        let command = DrawCommand::Array(DrawArraysArgs {
            count: index_count,
            instance_count: 1,
            first_index: regs.index_offset(),
            base_instance: 0,
        });
        self.open_draw(command)
    }

    /// Opens an indexed draw of `index_count` indices.
    pub fn begin_draw_elements(
        &mut self,
        regs: &RegisterFile,
        prim_type: PrimitiveType,
        index_count: u32,
        index_format: IndexFormat,
    ) -> Result<()> {
        ensure!(self.active.is_none(), "a draw is already open");
        if self.batch.prim_type != Some(prim_type)
            || !self.batch.indexed
            || self.batch.index_format != Some(index_format)
        {
            self.flush(FlushMode::Reconfigure)?;
        }
        self.batch.prim_type = Some(prim_type);
        self.batch.indexed = true;
        self.batch.index_format = Some(index_format);

        let command = DrawCommand::Indexed(DrawElementsArgs {
            count: index_count,
            instance_count: 1,
            first_index: regs.index_offset(),
            base_vertex: 0,
            base_instance: 0,
        });
        self.open_draw(command)
    }

    /// Shared begin path: stride bookkeeping, backpressure, slot acquisition.
    fn open_draw(&mut self, command: DrawCommand) -> Result<()> {
        if self.batch.needs_reconfigure {
            self.batch.needs_reconfigure = false;
            self.batch.command_stride = COMMAND_STRIDE;
            self.batch.state_stride = header::STATE_HEADER_BYTES as u32;
        }

        // Backpressure: when a ring cannot hold another record, drain the
        // already-committed draws. This forces earlier submission, never a
        // wait on GPU completion.
        if !self.command_ring.can_acquire(self.batch.command_stride as u64) {
            self.flush(FlushMode::MakeCoherent)?;
        }
        let command_allocation = self.command_ring.acquire(self.batch.command_stride as u64);

        if !self.state_ring.can_acquire(self.batch.state_stride as u64) {
            self.flush(FlushMode::MakeCoherent)?;
        }
        let state_allocation = self.state_ring.acquire(self.batch.state_stride as u64);

        let mut record = [0u8; COMMAND_STRIDE as usize];
        command.encode_into(&mut record);
        self.command_ring.write(&command_allocation, 0, &record);

        header::write_param_gen(&mut self.state_ring, &state_allocation, header::PARAM_GEN_NONE);

        self.active = Some(ActiveDraw {
            command_allocation,
            state_allocation,
            command,
        });
        Ok(())
    }

    /// Finalizes the open draw: snapshots constants, extends the batch
    /// ranges, commits both ring slots.
    pub fn commit_draw(&mut self, regs: &RegisterFile) -> Result<()> {
        let Some(draw) = self.active.take() else {
            bail!("commit_draw without an open draw");
        };

        // Must land before the state slot is committed.
        header::snapshot_constants(&mut self.state_ring, &draw.state_allocation, regs);

        if self.batch.state_range_start.is_none() {
            self.batch.command_range_start = Some(draw.command_allocation.offset);
            self.batch.state_range_start = Some(draw.state_allocation.offset);
        }
        self.batch.command_range_length += draw.command_allocation.aligned_length;
        self.batch.state_range_length += draw.state_allocation.aligned_length;

        self.command_ring.commit(draw.command_allocation);
        self.state_ring.commit(draw.state_allocation);

        self.batch.draw_count += 1;
        self.last_command = Some(draw.command);
        Ok(())
    }

    /// Abandons the open draw without affecting the batch. No-op when no
    /// draw is open.
    pub fn discard_draw(&mut self) {
        let Some(draw) = self.active.take() else {
            return;
        };
        self.command_ring.discard(draw.command_allocation);
        self.state_ring.discard(draw.state_allocation);
    }

    /// Submits the accumulated batch, if any, and resets accumulation.
    ///
    /// One draw uses the direct fast path; more use a single
    /// multi-draw-indirect call. An unsupported topology skips geometry with
    /// a diagnostic but still resets, so a malformed batch never stalls
    /// later ones.
    pub fn flush(&mut self, mode: FlushMode) -> Result<()> {
        if self.batch.draw_count > 0 {
            debug_assert!(self.batch.command_stride > 0);
            debug_assert!(self.batch.state_stride > 0);

            let Self {
                host,
                command_ring,
                state_ring,
                vertex_ring,
                batch,
                last_command,
                capture,
                ..
            } = self;

            // Make every committed byte host-visible before submission.
            command_ring.flush(|offset, bytes| host.flush_ring(RingKind::Command, offset, bytes));
            state_ring.flush(|offset, bytes| host.flush_ring(RingKind::DrawState, offset, bytes));
            vertex_ring.flush(|offset, bytes| host.flush_ring(RingKind::VertexData, offset, bytes));

            host.bind_draw_state(
                batch.state_range_start.unwrap_or(0),
                batch.state_range_length,
            );

            if let Some(prim_type) = batch.prim_type {
                match prim_type.host_topology() {
                    None => {
                        log::error!(
                            "unsupported primitive type {prim_type:?}; dropping a batch of {} draws",
                            batch.draw_count
                        );
                    }
                    Some(topology) => {
                        let index_format = if batch.indexed { batch.index_format } else { None };

                        capture.begin(host, prim_type);
                        if batch.draw_count == 1 {
                            if let Some(command) = last_command.as_ref() {
                                host.draw_single(topology, command, index_format);
                            }
                        } else {
                            host.draw_multi_indirect(
                                topology,
                                index_format,
                                batch.command_range_start.unwrap_or(0),
                                batch.draw_count,
                                batch.command_stride,
                            );
                        }
                        capture.end(host);
                    }
                }
            }

            batch.command_range_start = None;
            batch.command_range_length = 0;
            batch.state_range_start = None;
            batch.state_range_length = 0;
            batch.draw_count = 0;
            *last_command = None;
        }

        if mode == FlushMode::Reconfigure {
            self.batch.needs_reconfigure = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::header::{
        BOOL_CONSTS_OFFSET, FLOAT_CONSTS_OFFSET, LOOP_CONSTS_OFFSET, PARAM_GEN_OFFSET,
    };
    use crate::draw::primitive::{CaptureBucket, HostTopology};
    use crate::host::{HostCall, RecordingHost};
    use crate::regs::Register;

    fn small_config() -> BatchConfig {
        BatchConfig {
            command_ring_capacity: 4096,
            state_ring_capacity: 256 * 1024,
            vertex_ring_capacity: 4096,
            ..BatchConfig::default()
        }
    }

    fn batcher(config: BatchConfig) -> DrawBatcher<RecordingHost> {
        DrawBatcher::new(RecordingHost::new(), config).unwrap()
    }

    fn commit_arrays(b: &mut DrawBatcher<RecordingHost>, regs: &RegisterFile, count: u32) {
        b.begin_draw_arrays(regs, PrimitiveType::TriangleList, count).unwrap();
        b.commit_draw(regs).unwrap();
    }

    // ── submission shapes ─────────────────────────────────────────────────

    #[test]
    fn single_draw_uses_direct_path() {
        // Scenario A.
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        commit_arrays(&mut b, &regs, 3);
        b.flush(FlushMode::MakeCoherent).unwrap();

        let host = b.host();
        assert_eq!(host.draw_call_count(), 1);
        let draw = host
            .calls
            .iter()
            .find_map(|c| match c {
                HostCall::DrawSingle { topology, command, index_format } => {
                    Some((*topology, *command, *index_format))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(draw.0, HostTopology::Triangles);
        assert_eq!(
            draw.1,
            DrawCommand::Array(DrawArraysArgs {
                count: 3,
                instance_count: 1,
                first_index: 0,
                base_instance: 0,
            })
        );
        assert_eq!(draw.2, None);
    }

    #[test]
    fn two_indexed_draws_use_one_multi_draw() {
        // Scenario B.
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        for _ in 0..2 {
            b.begin_draw_elements(&regs, PrimitiveType::TriangleList, 6, IndexFormat::Uint16)
                .unwrap();
            b.commit_draw(&regs).unwrap();
        }
        b.flush(FlushMode::MakeCoherent).unwrap();

        let host = b.host();
        assert_eq!(host.draw_call_count(), 1);
        assert!(host.calls.contains(&HostCall::DrawMultiIndirect {
            topology: HostTopology::Triangles,
            index_format: Some(IndexFormat::Uint16),
            command_offset: 0,
            draw_count: 2,
            command_stride: COMMAND_STRIDE,
        }));
    }

    #[test]
    fn index_mode_change_flushes_between_draws() {
        // Scenario C: introducing an index format forces a clean break.
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        commit_arrays(&mut b, &regs, 3);
        assert_eq!(b.host().draw_call_count(), 0);

        b.begin_draw_elements(&regs, PrimitiveType::TriangleList, 6, IndexFormat::Uint32)
            .unwrap();
        // The arrays draw completed before the indexed draw opened.
        assert_eq!(b.host().draw_call_count(), 1);
        assert!(b.is_draw_open());

        b.commit_draw(&regs).unwrap();
        b.flush(FlushMode::MakeCoherent).unwrap();
        assert_eq!(b.host().draw_call_count(), 2);
    }

    #[test]
    fn homogeneous_run_stays_in_one_batch() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        for _ in 0..4 {
            commit_arrays(&mut b, &regs, 3);
        }
        assert_eq!(b.draw_count(), 4);
        assert_eq!(b.host().draw_call_count(), 0);

        b.flush(FlushMode::MakeCoherent).unwrap();
        assert!(b.host().calls.iter().any(|c| matches!(
            c,
            HostCall::DrawMultiIndirect { draw_count: 4, .. }
        )));
    }

    // ── pipeline reconfiguration ──────────────────────────────────────────

    #[test]
    fn same_pipeline_reconfigure_is_free() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());
        let (vs, ps) = (ShaderStageId(1), ShaderStageId(2));

        b.reconfigure_pipeline(vs, ps, PipelineId(7)).unwrap();
        commit_arrays(&mut b, &regs, 3);
        b.reconfigure_pipeline(vs, ps, PipelineId(7)).unwrap();
        commit_arrays(&mut b, &regs, 3);
        b.flush(FlushMode::MakeCoherent).unwrap();

        // Both draws survived in a single batch: no flush in between.
        assert_eq!(b.host().draw_call_count(), 1);
        assert!(b.host().calls.iter().any(|c| matches!(
            c,
            HostCall::DrawMultiIndirect { draw_count: 2, .. }
        )));
    }

    #[test]
    fn pipeline_change_breaks_the_batch() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());
        let (vs, ps) = (ShaderStageId(1), ShaderStageId(2));

        b.reconfigure_pipeline(vs, ps, PipelineId(1)).unwrap();
        commit_arrays(&mut b, &regs, 3);
        b.reconfigure_pipeline(vs, ps, PipelineId(2)).unwrap();

        assert_eq!(b.host().draw_call_count(), 1);
        assert_eq!(b.draw_count(), 0);
        assert_eq!(b.pipeline(), Some(PipelineId(2)));
    }

    // ── draw accounting ───────────────────────────────────────────────────

    #[test]
    fn draw_count_tracks_commits_not_discards() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        commit_arrays(&mut b, &regs, 3);
        commit_arrays(&mut b, &regs, 3);
        b.begin_draw_arrays(&regs, PrimitiveType::TriangleList, 3).unwrap();
        b.discard_draw();

        assert_eq!(b.draw_count(), 2);
        assert!(!b.is_draw_open());

        b.flush(FlushMode::MakeCoherent).unwrap();
        assert!(b.host().calls.iter().any(|c| matches!(
            c,
            HostCall::DrawMultiIndirect { draw_count: 2, .. }
        )));
    }

    #[test]
    fn overlapping_begin_is_rejected() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        b.begin_draw_arrays(&regs, PrimitiveType::TriangleList, 3).unwrap();
        assert!(b.begin_draw_arrays(&regs, PrimitiveType::TriangleList, 3).is_err());
    }

    #[test]
    fn discard_without_open_draw_is_noop() {
        let mut b = batcher(small_config());
        b.discard_draw();
        assert!(!b.is_draw_open());
    }

    #[test]
    fn empty_flush_touches_nothing() {
        let mut b = batcher(small_config());
        b.flush(FlushMode::MakeCoherent).unwrap();
        b.flush(FlushMode::Reconfigure).unwrap();
        assert!(b.host().calls.is_empty());
    }

    // ── register snapshots ────────────────────────────────────────────────

    #[test]
    fn committed_state_record_is_byte_identical_to_registers() {
        let mut regs = RegisterFile::new();
        regs.write(Register::FloatConstant(0), 0x3f80_0000);
        regs.write(Register::FloatConstant(2047), 0xdead_beef);
        regs.write(Register::BoolConstant(7), 0x0000_00ff);
        regs.write(Register::LoopConstant(0), 0x1234_5678);

        let mut b = batcher(small_config());
        commit_arrays(&mut b, &regs, 3);
        b.flush(FlushMode::MakeCoherent).unwrap();

        let (offset, bytes) = b.host().last_state_upload().unwrap();
        assert_eq!(offset, 0);
        assert_eq!(&bytes[PARAM_GEN_OFFSET..PARAM_GEN_OFFSET + 4], &(-1i32).to_le_bytes());
        assert_eq!(
            &bytes[FLOAT_CONSTS_OFFSET..FLOAT_CONSTS_OFFSET + crate::regs::FLOAT_WINDOW_BYTES],
            regs.float_window()
        );
        assert_eq!(
            &bytes[BOOL_CONSTS_OFFSET..BOOL_CONSTS_OFFSET + crate::regs::BOOL_WINDOW_BYTES],
            regs.bool_window()
        );
        assert_eq!(
            &bytes[LOOP_CONSTS_OFFSET..LOOP_CONSTS_OFFSET + crate::regs::LOOP_WINDOW_BYTES],
            regs.loop_window()
        );
    }

    #[test]
    fn first_index_comes_from_the_index_offset_register() {
        let mut regs = RegisterFile::new();
        regs.write(Register::IndexOffset, 5);

        let mut b = batcher(small_config());
        commit_arrays(&mut b, &regs, 9);
        b.flush(FlushMode::MakeCoherent).unwrap();

        assert!(b.host().calls.iter().any(|c| matches!(
            c,
            HostCall::DrawSingle {
                command: DrawCommand::Array(DrawArraysArgs { first_index: 5, count: 9, .. }),
                ..
            }
        )));
    }

    // ── backpressure ──────────────────────────────────────────────────────

    #[test]
    fn command_ring_exhaustion_forces_midbatch_flush() {
        // Scenario E: room for exactly three records before the ring is full.
        let regs = RegisterFile::new();
        let mut b = batcher(BatchConfig {
            command_ring_capacity: 64,
            ..small_config()
        });

        for _ in 0..3 {
            commit_arrays(&mut b, &regs, 3);
        }
        assert_eq!(b.draw_count(), 3);
        assert_eq!(b.host().draw_call_count(), 0);

        // The fourth begin cannot acquire a command slot; the batch drains
        // first, then accumulation restarts at zero.
        b.begin_draw_arrays(&regs, PrimitiveType::TriangleList, 3).unwrap();
        assert!(b.host().calls.iter().any(|c| matches!(
            c,
            HostCall::DrawMultiIndirect { draw_count: 3, .. }
        )));
        assert_eq!(b.draw_count(), 0);

        b.commit_draw(&regs).unwrap();
        assert_eq!(b.draw_count(), 1);

        b.flush(FlushMode::MakeCoherent).unwrap();
        assert_eq!(b.host().draw_call_count(), 2);
    }

    // ── topology handling ─────────────────────────────────────────────────

    #[test]
    fn unsupported_topology_skips_geometry_but_resets() {
        crate::logging::init();
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        b.begin_draw_arrays(&regs, PrimitiveType::Unknown, 3).unwrap();
        b.commit_draw(&regs).unwrap();
        b.flush(FlushMode::MakeCoherent).unwrap();

        let host = b.host();
        assert_eq!(host.draw_call_count(), 0);
        // Ring visibility still happened; accumulation reset.
        assert!(host.calls.iter().any(|c| matches!(c, HostCall::FlushRing { .. })));
        assert_eq!(b.draw_count(), 0);

        // A later well-formed batch is unaffected.
        commit_arrays(&mut b, &regs, 3);
        b.flush(FlushMode::MakeCoherent).unwrap();
        assert_eq!(b.host().draw_call_count(), 1);
    }

    #[test]
    fn quad_list_submits_as_adjacency() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        b.begin_draw_arrays(&regs, PrimitiveType::QuadList, 4).unwrap();
        b.commit_draw(&regs).unwrap();
        b.flush(FlushMode::MakeCoherent).unwrap();

        assert!(b.host().calls.iter().any(|c| matches!(
            c,
            HostCall::DrawSingle { topology: HostTopology::LinesAdjacency, .. }
        )));
    }

    // ── capture ───────────────────────────────────────────────────────────

    #[test]
    fn capture_brackets_the_flushed_draw() {
        // Scenario D: 10 captured triangles.
        let regs = RegisterFile::new();
        let mut b = batcher(BatchConfig {
            capture_enabled: true,
            ..small_config()
        });
        b.host_mut().primitive_count = 10;

        commit_arrays(&mut b, &regs, 30);
        b.flush(FlushMode::MakeCoherent).unwrap();

        let host = b.host();
        let begin = host
            .calls
            .iter()
            .position(|c| matches!(c, HostCall::BeginCapture { bucket: CaptureBucket::Triangles }))
            .unwrap();
        let draw = host
            .calls
            .iter()
            .position(|c| matches!(c, HostCall::DrawSingle { .. }))
            .unwrap();
        let end = host
            .calls
            .iter()
            .position(|c| matches!(c, HostCall::EndCapture))
            .unwrap();
        assert!(begin < draw && draw < end);

        assert_eq!(b.captured_byte_size(), 10 * 3 * 4 * 4);
    }

    #[test]
    fn capture_readback_roundtrip() {
        let regs = RegisterFile::new();
        let mut b = batcher(BatchConfig {
            capture_enabled: true,
            ..small_config()
        });
        b.host_mut().primitive_count = 1;
        b.host_mut().capture_data = (0u8..48).collect();

        commit_arrays(&mut b, &regs, 3);
        b.flush(FlushMode::MakeCoherent).unwrap();

        let mut dst = [0u8; 8];
        b.read_captured(16, &mut dst).unwrap();
        assert_eq!(dst, [16, 17, 18, 19, 20, 21, 22, 23]);

        let mut too_much = [0u8; 64];
        assert!(b.read_captured(0, &mut too_much).is_err());
    }

    #[test]
    fn capture_init_failure_surfaces_at_construction() {
        let host = RecordingHost {
            fail_capture_init: true,
            ..RecordingHost::new()
        };
        let result = DrawBatcher::new(
            host,
            BatchConfig {
                capture_enabled: true,
                ..small_config()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn disabled_capture_stays_silent() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        commit_arrays(&mut b, &regs, 3);
        b.flush(FlushMode::MakeCoherent).unwrap();

        assert!(!b.host().calls.iter().any(|c| matches!(
            c,
            HostCall::BeginCapture { .. } | HostCall::EndCapture | HostCall::InitCapture { .. }
        )));
        assert_eq!(b.captured_byte_size(), 0);
    }

    // ── state binding ─────────────────────────────────────────────────────

    #[test]
    fn state_range_spans_every_committed_draw() {
        let regs = RegisterFile::new();
        let mut b = batcher(small_config());

        // State records are 8356 bytes, padded to 8448 by the 256-byte ring
        // alignment.
        for _ in 0..3 {
            commit_arrays(&mut b, &regs, 3);
        }
        b.flush(FlushMode::MakeCoherent).unwrap();

        assert!(b.host().calls.contains(&HostCall::BindDrawState {
            offset: 0,
            length: 3 * 8448,
        }));
    }
}
