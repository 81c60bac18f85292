//! Opaque handles and small enums shared by the context and its backends.

/// Backend-assigned id of a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ProgramId(pub u32);

/// Backend-assigned id of an uploaded buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BufferId(pub u32);

/// Vertex input slot of a program (the attribute's `@location`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AttributeSlot(pub u32);

/// Uniform slot of a program (the uniform's `@binding` in group 0).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UniformSlot(pub u32);

/// What a buffer is bound as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    /// `f32` vertex data.
    Vertex,
    /// `u16` element indices.
    Index,
}

/// How vertices are assembled into primitives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Outcome of starting a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    /// The surface is ready; draws recorded until `end_frame` are presented.
    Ready,
    /// The surface asked for this frame to be dropped (outdated, timeout).
    Skipped,
}
