//! Vertex capture (stream-out emulation).
//!
//! When enabled, capture brackets each flushed draw call: the host redirects
//! vertex-stage output into a capture buffer and counts assembled primitives
//! with a query. The count read at end is blocking; there is no async or
//! polled variant.

use anyhow::{ensure, Result};

use crate::host::HostApi;

use super::primitive::{CaptureBucket, PrimitiveType};

/// Default capture buffer size in bytes.
// TODO: size the buffer from the primitive count of the previous flush
// instead of a fixed cap.
pub const CAPTURE_BUFFER_CAPACITY: u64 = 16384 * 4;

/// Bytes per captured vertex: four 32-bit components.
const BYTES_PER_VERTEX: u64 = 4 * 4;

/// Capture lifecycle state.
///
/// `primitive_count` is only meaningful between an [`end`] and the next
/// [`begin`], which overwrites it.
///
/// [`begin`]: CaptureState::begin
/// [`end`]: CaptureState::end
#[derive(Debug)]
pub struct CaptureState {
    enabled: bool,
    bucket: Option<CaptureBucket>,
    primitive_count: u32,
}

impl CaptureState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bucket: None,
            primitive_count: 0,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Primitive count from the most recent completed capture.
    #[inline]
    pub fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    /// Starts capturing around a draw of `prim_type`.
    pub fn begin<H: HostApi>(&mut self, host: &mut H, prim_type: PrimitiveType) {
        if !self.enabled {
            return;
        }
        let Some(bucket) = prim_type.capture_bucket() else {
            return;
        };
        self.bucket = Some(bucket);
        self.primitive_count = 0;
        host.begin_capture(bucket);
    }

    /// Stops capturing and caches the primitive count.
    ///
    /// Blocks until the host's query result is available.
    pub fn end<H: HostApi>(&mut self, host: &mut H) {
        if !self.enabled || self.bucket.is_none() {
            return;
        }
        self.primitive_count = host.end_capture();
    }

    /// Total byte size of the captured vertex data; 0 when capture is
    /// disabled or nothing has completed.
    pub fn captured_byte_size(&self) -> u64 {
        if !self.enabled {
            return 0;
        }
        let Some(bucket) = self.bucket else {
            return 0;
        };
        u64::from(self.primitive_count) * bucket.vertices_per_primitive() * BYTES_PER_VERTEX
    }

    /// Copies captured bytes starting at `offset` into `dst`.
    ///
    /// Fails when capture is disabled or when the requested range reaches
    /// past the captured size (fail-fast; no truncation).
    pub fn readback<H: HostApi>(&self, host: &mut H, offset: u64, dst: &mut [u8]) -> Result<()> {
        ensure!(self.enabled, "vertex capture is not enabled");
        let available = self.captured_byte_size();
        ensure!(
            offset + dst.len() as u64 <= available,
            "capture readback out of range: {} bytes at {} but only {} captured",
            dst.len(),
            offset,
            available
        );
        host.read_capture(offset, dst)
    }
}
