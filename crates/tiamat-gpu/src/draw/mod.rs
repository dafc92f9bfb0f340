//! Draw batching.
//!
//! Responsibilities:
//! - encode guest draws as fixed-stride indirect records in the command ring
//! - snapshot shader constants per draw into the state ring
//! - detect configuration breaks (pipeline/topology/index format) and flush
//! - orchestrate single-draw and multi-draw-indirect submission
//! - wrap optional vertex capture (stream-out emulation) around each flush

mod args;
mod batcher;
mod capture;
mod header;
mod primitive;

pub use args::{DrawArraysArgs, DrawCommand, DrawElementsArgs, COMMAND_STRIDE};
pub use batcher::{
    BatchConfig, DrawBatcher, FlushMode, PipelineId, ShaderStageId, COMMAND_RING_ALIGNMENT,
    COMMAND_RING_CAPACITY, STATE_RING_ALIGNMENT, STATE_RING_CAPACITY, VERTEX_RING_ALIGNMENT,
    VERTEX_RING_CAPACITY,
};
pub use capture::{CaptureState, CAPTURE_BUFFER_CAPACITY};
pub use header::{
    BOOL_CONSTS_OFFSET, FLOAT_CONSTS_OFFSET, LOOP_CONSTS_OFFSET, PARAM_GEN_NONE,
    PARAM_GEN_OFFSET, STATE_HEADER_BYTES,
};
pub use primitive::{CaptureBucket, HostTopology, IndexFormat, PrimitiveType};
