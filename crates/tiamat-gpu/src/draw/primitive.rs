//! Guest primitive topologies and their host-side mappings.

/// Primitive topology as encoded in the guest command stream.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveType {
    PointList,
    LineList,
    LineStrip,
    LineLoop,
    TriangleList,
    TriangleFan,
    TriangleStrip,
    RectangleList,
    QuadList,
    /// Encodings this backend does not understand.
    Unknown,
}

/// Index element format for indexed draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    #[inline]
    pub fn byte_size(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Topology handed to the host API for submission.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HostTopology {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    /// Consumed by an external geometry-expansion stage (quad lists).
    LinesAdjacency,
}

/// Assembled-primitive bucket used by vertex capture.
///
/// Capture counts assembled primitives, not raw topology, so strips, fans
/// and loops collapse into their base bucket.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CaptureBucket {
    Points,
    Lines,
    Triangles,
}

impl CaptureBucket {
    #[inline]
    pub fn vertices_per_primitive(self) -> u64 {
        match self {
            CaptureBucket::Points => 1,
            CaptureBucket::Lines => 2,
            CaptureBucket::Triangles => 3,
        }
    }
}

impl PrimitiveType {
    /// Host topology used for submission, or `None` when the type cannot be
    /// drawn at all.
    pub fn host_topology(self) -> Option<HostTopology> {
        match self {
            PrimitiveType::PointList => Some(HostTopology::Points),
            PrimitiveType::LineList => Some(HostTopology::Lines),
            PrimitiveType::LineStrip => Some(HostTopology::LineStrip),
            PrimitiveType::LineLoop => Some(HostTopology::LineLoop),
            PrimitiveType::TriangleList => Some(HostTopology::Triangles),
            PrimitiveType::TriangleStrip => Some(HostTopology::TriangleStrip),
            PrimitiveType::TriangleFan => Some(HostTopology::TriangleFan),
            // Rectangle lists are never culled by the guest; host-side
            // primitive culling stays disabled for them (not enforced here).
            PrimitiveType::RectangleList => Some(HostTopology::Triangles),
            // The external geometry-expansion stage consumes this as an
            // adjacency list. Depending on its shader configuration it may
            // emit lines instead of triangles; that ambiguity is the
            // expansion stage's to resolve.
            PrimitiveType::QuadList => Some(HostTopology::LinesAdjacency),
            PrimitiveType::Unknown => None,
        }
    }

    /// Capture bucket for this topology, or `None` when capture cannot
    /// classify it.
    pub fn capture_bucket(self) -> Option<CaptureBucket> {
        match self {
            PrimitiveType::PointList => Some(CaptureBucket::Points),
            PrimitiveType::LineList | PrimitiveType::LineStrip | PrimitiveType::LineLoop => {
                Some(CaptureBucket::Lines)
            }
            PrimitiveType::TriangleList
            | PrimitiveType::TriangleStrip
            | PrimitiveType::TriangleFan
            | PrimitiveType::RectangleList
            | PrimitiveType::QuadList => Some(CaptureBucket::Triangles),
            PrimitiveType::Unknown => None,
        }
    }
}
