#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// A slot handed out by [`RingBuffer::acquire`].
///
/// Owned exclusively by the holder until it is committed or discarded.
#[derive(Debug)]
pub struct RingAllocation {
    /// Byte offset of the slot within the ring.
    pub offset: u64,
    /// Requested length in bytes.
    pub length: u64,
    /// Length rounded up to the ring alignment; consecutive allocations are
    /// spaced by this value.
    pub aligned_length: u64,
}

/// Fixed-capacity byte arena with monotonic allocation and periodic reuse.
///
/// Contract:
/// - callers must check [`can_acquire`] before every [`acquire`]
/// - at most one outstanding (acquired, uncommitted) allocation at a time
/// - [`flush`] hands every committed-since-last-flush byte to the sink; only
///   after that may the write position wrap back to the front
///
/// [`can_acquire`]: RingBuffer::can_acquire
/// [`acquire`]: RingBuffer::acquire
/// [`flush`]: RingBuffer::flush
#[derive(Debug)]
pub struct RingBuffer {
    data: Box<[u8]>,
    alignment: u64,
    /// Next allocation offset.
    head: u64,
    /// First committed-but-unflushed byte. Meaningful only when
    /// `dirty_len > 0`.
    dirty_start: u64,
    dirty_len: u64,
    outstanding: bool,
}

impl RingBuffer {
    pub fn new(capacity: u64, alignment: u64) -> Self {
        assert!(alignment.is_power_of_two(), "ring alignment must be a power of two");
        assert!(capacity >= alignment, "ring capacity below alignment");
        Self {
            data: vec![0u8; capacity as usize].into_boxed_slice(),
            alignment,
            head: 0,
            dirty_start: 0,
            dirty_len: 0,
            outstanding: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.data.len() as u64
    }

    #[inline]
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Whether an allocation of `size` bytes can be satisfied right now.
    ///
    /// Wrapping to the front is only possible once every committed byte has
    /// been flushed and nothing is outstanding, so a flushed span is always
    /// contiguous.
    pub fn can_acquire(&self, size: u64) -> bool {
        let aligned = align_up(size, self.alignment);
        if self.head + aligned <= self.capacity() {
            return true;
        }
        aligned <= self.capacity() && self.dirty_len == 0 && !self.outstanding
    }

    /// Takes the next slot. Callers must have checked [`Self::can_acquire`].
    pub fn acquire(&mut self, size: u64) -> RingAllocation {
        debug_assert!(!self.outstanding, "ring already has an outstanding allocation");
        debug_assert!(self.can_acquire(size), "ring acquire without a capacity check");

        let aligned = align_up(size, self.alignment);
        if self.head + aligned > self.capacity() {
            // Legal per can_acquire: nothing committed-unflushed, nothing
            // outstanding. The flushed contents were already copied out, so
            // the front of the arena is reusable.
            self.head = 0;
        }

        let offset = self.head;
        self.head += aligned;
        self.outstanding = true;

        RingAllocation {
            offset,
            length: size,
            aligned_length: aligned,
        }
    }

    /// Writes into an outstanding allocation at `at` bytes from its start.
    pub fn write(&mut self, alloc: &RingAllocation, at: u64, bytes: &[u8]) {
        debug_assert!(self.outstanding, "write into a ring with no outstanding allocation");
        debug_assert!(
            at + bytes.len() as u64 <= alloc.length,
            "write past the end of a ring allocation"
        );
        let start = (alloc.offset + at) as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Marks an allocation's bytes as finalized and pending visibility.
    pub fn commit(&mut self, alloc: RingAllocation) {
        debug_assert!(self.outstanding, "commit without an outstanding allocation");
        self.outstanding = false;

        if self.dirty_len == 0 {
            self.dirty_start = alloc.offset;
        }
        self.dirty_len += alloc.aligned_length;
    }

    /// Abandons an allocation without use, rewinding the write position.
    pub fn discard(&mut self, alloc: RingAllocation) {
        debug_assert!(self.outstanding, "discard without an outstanding allocation");
        self.outstanding = false;
        self.head = alloc.offset;
    }

    /// Delivers all committed-since-last-flush bytes to `sink`.
    ///
    /// This is the ring's memory-visibility barrier: after the sink returns,
    /// the span may be reused by later acquisitions.
    pub fn flush<F>(&mut self, mut sink: F)
    where
        F: FnMut(u64, &[u8]),
    {
        if self.dirty_len == 0 {
            return;
        }
        let start = self.dirty_start as usize;
        let end = (self.dirty_start + self.dirty_len) as usize;
        sink(self.dirty_start, &self.data[start..end]);
        self.dirty_len = 0;
    }
}
