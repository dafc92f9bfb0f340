//! Indirect draw argument records.
//!
//! The host API reads these as fixed-stride records straight out of the
//! command ring, so field order, signedness and size are part of the wire
//! contract. Encoding into ring bytes is explicit and little-endian; nothing
//! relies on aliasing ring memory as structs.

use bytemuck::{Pod, Zeroable};

/// Record for a non-indexed draw. 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct DrawArraysArgs {
    pub count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_instance: u32,
}

impl DrawArraysArgs {
    pub const SIZE: usize = 16;

    pub fn encode_into(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.count.to_le_bytes());
        out[4..8].copy_from_slice(&self.instance_count.to_le_bytes());
        out[8..12].copy_from_slice(&self.first_index.to_le_bytes());
        out[12..16].copy_from_slice(&self.base_instance.to_le_bytes());
    }
}

/// Record for an indexed draw. 20 bytes; `base_vertex` is signed.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct DrawElementsArgs {
    pub count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub base_instance: u32,
}

impl DrawElementsArgs {
    pub const SIZE: usize = 20;

    pub fn encode_into(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.count.to_le_bytes());
        out[4..8].copy_from_slice(&self.instance_count.to_le_bytes());
        out[8..12].copy_from_slice(&self.first_index.to_le_bytes());
        out[12..16].copy_from_slice(&self.base_vertex.to_le_bytes());
        out[16..20].copy_from_slice(&self.base_instance.to_le_bytes());
    }
}

// Layout validation; these sizes are consumed by the host's indirect fetch.
const _: [(); 16] = [(); size_of::<DrawArraysArgs>()];
const _: [(); 20] = [(); size_of::<DrawElementsArgs>()];
const _: [(); 4] = [(); align_of::<DrawArraysArgs>()];
const _: [(); 4] = [(); align_of::<DrawElementsArgs>()];

const fn round_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

const LARGEST_RECORD: usize = if DrawArraysArgs::SIZE > DrawElementsArgs::SIZE {
    DrawArraysArgs::SIZE
} else {
    DrawElementsArgs::SIZE
};

/// Shared spacing between consecutive command-ring records.
///
/// Both record shapes are padded to the larger one so indirect addressing is
/// uniform regardless of which shape a batch carries.
pub const COMMAND_STRIDE: u32 = round_up(LARGEST_RECORD, 4) as u32;

/// A draw's encoded parameters, tagged by indexing mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawCommand {
    Array(DrawArraysArgs),
    Indexed(DrawElementsArgs),
}

impl DrawCommand {
    #[inline]
    pub fn is_indexed(&self) -> bool {
        matches!(self, DrawCommand::Indexed(_))
    }

    #[inline]
    pub fn encoded_size(&self) -> usize {
        match self {
            DrawCommand::Array(_) => DrawArraysArgs::SIZE,
            DrawCommand::Indexed(_) => DrawElementsArgs::SIZE,
        }
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        match self {
            DrawCommand::Array(args) => args.encode_into(out),
            DrawCommand::Indexed(args) => args.encode_into(out),
        }
    }
}
