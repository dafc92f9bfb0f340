//! wgpu-backed host.
//!
//! Ring flushes land in GPU buffers via `Queue::write_buffer`. Draw calls are
//! queued and replayed into an embedder-provided render pass with
//! [`WgpuHost::encode_pass`]; the embedder owns the pass, its attachments and
//! the bound pipeline (including its topology). Vertex capture is not
//! supported on this host.

use anyhow::{bail, Context, Result};

use crate::draw::{
    CaptureBucket, DrawCommand, HostTopology, IndexFormat, COMMAND_RING_CAPACITY,
    STATE_RING_CAPACITY, VERTEX_RING_CAPACITY,
};

use super::{HostApi, RingKind};

/// Initialization parameters for the wgpu host.
#[derive(Debug, Clone)]
pub struct WgpuHostConfig {
    pub power_preference: wgpu::PowerPreference,

    /// GPU-side ring buffer sizes. Must cover the capacities the batcher was
    /// configured with.
    pub command_capacity: u64,
    pub state_capacity: u64,
    pub vertex_capacity: u64,
}

impl Default for WgpuHostConfig {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            command_capacity: COMMAND_RING_CAPACITY,
            state_capacity: STATE_RING_CAPACITY,
            vertex_capacity: VERTEX_RING_CAPACITY,
        }
    }
}

/// A draw queued between flush and pass encoding.
#[derive(Debug)]
enum PendingDraw {
    Direct {
        topology: HostTopology,
        command: DrawCommand,
        index_format: Option<IndexFormat>,
    },
    MultiIndirect {
        topology: HostTopology,
        index_format: Option<IndexFormat>,
        command_offset: u64,
        draw_count: u32,
        command_stride: u32,
    },
}

/// Host submission through wgpu.
///
/// Owns the GPU-side mirrors of the three engine rings. Draw calls queue in
/// arrival order until [`encode_pass`] replays them.
///
/// [`encode_pass`]: WgpuHost::encode_pass
pub struct WgpuHost {
    device: wgpu::Device,
    queue: wgpu::Queue,
    command_buffer: wgpu::Buffer,
    state_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    /// Byte range of the state buffer bound for the queued draws.
    state_range: (u64, u64),
    pending: Vec<PendingDraw>,
    warned_topology: bool,
}

impl WgpuHost {
    /// Features the device must carry for indirect batch submission.
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::MULTI_DRAW_INDIRECT
    }

    /// Wraps an existing device and queue.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, config: &WgpuHostConfig) -> Self {
        let command_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat command ring"),
            size: config.command_capacity,
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let state_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat draw-state ring"),
            size: config.state_capacity,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat vertex-data ring"),
            size: config.vertex_capacity,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            command_buffer,
            state_buffer,
            vertex_buffer,
            state_range: (0, 0),
            pending: Vec::new(),
            warned_topology: false,
        }
    }

    /// Creates a device with no surface attached and wraps it.
    pub fn new_headless(config: &WgpuHostConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tiamat-gpu device"),
            required_features: Self::required_features(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")?;

        Ok(Self::from_device(device, queue, config))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The guest stream-data buffer, for embedder vertex bindings.
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    /// Binding over the state range of the queued draws, for the embedder's
    /// per-draw constant bind group.
    pub fn state_binding(&self) -> wgpu::BufferBinding<'_> {
        wgpu::BufferBinding {
            buffer: &self.state_buffer,
            offset: self.state_range.0,
            size: wgpu::BufferSize::new(self.state_range.1),
        }
    }

    /// Number of draws waiting for a pass.
    pub fn pending_draws(&self) -> usize {
        self.pending.len()
    }

    /// Replays the queued draws into `pass`, in arrival order.
    ///
    /// The pass must already carry the pipeline and vertex bindings; indexed
    /// draws bind the whole stream-data buffer as their index source. Draws
    /// whose topology wgpu cannot express are skipped with a one-shot
    /// warning.
    pub fn encode_pass(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        for op in std::mem::take(&mut self.pending) {
            match op {
                PendingDraw::Direct {
                    topology,
                    command,
                    index_format,
                } => {
                    if !self.check_topology(topology) {
                        continue;
                    }
                    match command {
                        DrawCommand::Array(args) => {
                            pass.draw(
                                args.first_index..args.first_index + args.count,
                                args.base_instance..args.base_instance + args.instance_count,
                            );
                        }
                        DrawCommand::Indexed(args) => {
                            if let Some(format) = index_format {
                                pass.set_index_buffer(
                                    self.vertex_buffer.slice(..),
                                    index_buffer_format(format),
                                );
                            }
                            pass.draw_indexed(
                                args.first_index..args.first_index + args.count,
                                args.base_vertex,
                                args.base_instance..args.base_instance + args.instance_count,
                            );
                        }
                    }
                }
                PendingDraw::MultiIndirect {
                    topology,
                    index_format,
                    command_offset,
                    draw_count,
                    command_stride,
                } => {
                    if !self.check_topology(topology) {
                        continue;
                    }
                    match index_format {
                        Some(format) => {
                            // Indexed records match wgpu's packed 20-byte
                            // layout exactly, so the whole batch goes out in
                            // one call.
                            pass.set_index_buffer(
                                self.vertex_buffer.slice(..),
                                index_buffer_format(format),
                            );
                            pass.multi_draw_indexed_indirect(
                                &self.command_buffer,
                                command_offset,
                                draw_count,
                            );
                        }
                        None => {
                            // Non-indexed records are stride-padded past
                            // wgpu's packed 16-byte layout; replay them one
                            // record at a time.
                            for i in 0..draw_count {
                                pass.draw_indirect(
                                    &self.command_buffer,
                                    command_offset + u64::from(i) * u64::from(command_stride),
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    fn check_topology(&mut self, topology: HostTopology) -> bool {
        if wgpu_topology(topology).is_some() {
            return true;
        }
        if !self.warned_topology {
            self.warned_topology = true;
            log::warn!("skipping draws with topology {topology:?}; wgpu cannot express it");
        }
        false
    }
}

impl HostApi for WgpuHost {
    fn flush_ring(&mut self, ring: RingKind, offset: u64, bytes: &[u8]) {
        let buffer = match ring {
            RingKind::Command => &self.command_buffer,
            RingKind::DrawState => &self.state_buffer,
            RingKind::VertexData => &self.vertex_buffer,
        };
        self.queue.write_buffer(buffer, offset, bytes);
    }

    fn bind_draw_state(&mut self, offset: u64, length: u64) {
        self.state_range = (offset, length);
    }

    fn draw_single(
        &mut self,
        topology: HostTopology,
        command: &DrawCommand,
        index_format: Option<IndexFormat>,
    ) {
        self.pending.push(PendingDraw::Direct {
            topology,
            command: *command,
            index_format,
        });
    }

    fn draw_multi_indirect(
        &mut self,
        topology: HostTopology,
        index_format: Option<IndexFormat>,
        command_offset: u64,
        draw_count: u32,
        command_stride: u32,
    ) {
        self.pending.push(PendingDraw::MultiIndirect {
            topology,
            index_format,
            command_offset,
            draw_count,
            command_stride,
        });
    }

    fn init_capture(&mut self, _capacity: u64) -> Result<()> {
        // wgpu has no vertex stream-out; capture needs a different host.
        bail!("vertex capture is not supported by the wgpu host");
    }

    fn begin_capture(&mut self, _bucket: CaptureBucket) {}

    fn end_capture(&mut self) -> u32 {
        0
    }

    fn read_capture(&mut self, _offset: u64, _dst: &mut [u8]) -> Result<()> {
        bail!("vertex capture is not supported by the wgpu host");
    }
}

/// Maps a host topology to wgpu's pipeline topology, where one exists.
///
/// Loops, fans and adjacency lists have no wgpu equivalent; embedders must
/// pre-expand those streams before batching.
pub fn wgpu_topology(topology: HostTopology) -> Option<wgpu::PrimitiveTopology> {
    match topology {
        HostTopology::Points => Some(wgpu::PrimitiveTopology::PointList),
        HostTopology::Lines => Some(wgpu::PrimitiveTopology::LineList),
        HostTopology::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
        HostTopology::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
        HostTopology::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
        HostTopology::LineLoop | HostTopology::TriangleFan | HostTopology::LinesAdjacency => None,
    }
}

fn index_buffer_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}
