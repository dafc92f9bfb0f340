//! Recording host: headless [`HostApi`] that logs every call.

use anyhow::{ensure, Result};

use crate::draw::{CaptureBucket, DrawCommand, HostTopology, IndexFormat};

use super::{HostApi, RingKind};

/// One observed host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    FlushRing {
        ring: RingKind,
        offset: u64,
        bytes: Vec<u8>,
    },
    BindDrawState {
        offset: u64,
        length: u64,
    },
    DrawSingle {
        topology: HostTopology,
        command: DrawCommand,
        index_format: Option<IndexFormat>,
    },
    DrawMultiIndirect {
        topology: HostTopology,
        index_format: Option<IndexFormat>,
        command_offset: u64,
        draw_count: u32,
        command_stride: u32,
    },
    InitCapture {
        capacity: u64,
    },
    BeginCapture {
        bucket: CaptureBucket,
    },
    EndCapture,
}

/// Headless host that records calls instead of talking to a GPU.
///
/// `primitive_count` is handed back by `end_capture`; `capture_data` backs
/// `read_capture`. Both are plain fields so a test can script them.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    pub primitive_count: u32,
    pub capture_data: Vec<u8>,
    pub fail_capture_init: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of draw submissions (direct or indirect) observed so far.
    pub fn draw_call_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    HostCall::DrawSingle { .. } | HostCall::DrawMultiIndirect { .. }
                )
            })
            .count()
    }

    /// Most recent recorded state-ring flush, if any.
    pub fn last_state_upload(&self) -> Option<(u64, &[u8])> {
        self.calls.iter().rev().find_map(|c| match c {
            HostCall::FlushRing {
                ring: RingKind::DrawState,
                offset,
                bytes,
            } => Some((*offset, bytes.as_slice())),
            _ => None,
        })
    }
}

impl HostApi for RecordingHost {
    fn flush_ring(&mut self, ring: RingKind, offset: u64, bytes: &[u8]) {
        self.calls.push(HostCall::FlushRing {
            ring,
            offset,
            bytes: bytes.to_vec(),
        });
    }

    fn bind_draw_state(&mut self, offset: u64, length: u64) {
        self.calls.push(HostCall::BindDrawState { offset, length });
    }

    fn draw_single(
        &mut self,
        topology: HostTopology,
        command: &DrawCommand,
        index_format: Option<IndexFormat>,
    ) {
        self.calls.push(HostCall::DrawSingle {
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
        self.calls.push(HostCall::DrawMultiIndirect {
            topology,
            index_format,
            command_offset,
            draw_count,
            command_stride,
        });
    }

    fn init_capture(&mut self, capacity: u64) -> Result<()> {
        ensure!(!self.fail_capture_init, "capture init scripted to fail");
        self.calls.push(HostCall::InitCapture { capacity });
        Ok(())
    }

    fn begin_capture(&mut self, bucket: CaptureBucket) {
        self.calls.push(HostCall::BeginCapture { bucket });
    }

    fn end_capture(&mut self) -> u32 {
        self.calls.push(HostCall::EndCapture);
        self.primitive_count
    }

    fn read_capture(&mut self, offset: u64, dst: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + dst.len();
        ensure!(
            end <= self.capture_data.len(),
            "capture buffer read past the end"
        );
        dst.copy_from_slice(&self.capture_data[start..end]);
        Ok(())
    }
}
