use glam::Vec3;

use crate::device::{Backend, GraphicsContext, Topology};
use crate::geometry::{GeometryBuffer, IndexBuffer};

/// One drawable registered with a `Scene`: buffers, topology and placement.
///
/// A mesh is drawn with exactly one draw call. With indices it is an indexed
/// draw over `indices.count()` elements, otherwise a plain draw over the
/// position buffer's item count.
#[derive(Debug)]
pub struct Mesh {
    pub(super) positions: GeometryBuffer,
    pub(super) attributes: Vec<(String, GeometryBuffer)>,
    pub(super) indices: Option<IndexBuffer>,
    pub(super) topology: Topology,
    pub(super) offset: Vec3,
    pub(super) spin: Option<Vec3>,
}

impl Mesh {
    pub fn new(positions: GeometryBuffer, topology: Topology) -> Self {
        Self {
            positions,
            attributes: Vec::new(),
            indices: None,
            topology,
            offset: Vec3::ZERO,
            spin: None,
        }
    }

    /// Feeds `buffer` to the program attribute `name` (e.g. per-vertex colors).
    pub fn with_attribute(mut self, name: impl Into<String>, buffer: GeometryBuffer) -> Self {
        self.attributes.push((name.into(), buffer));
        self
    }

    pub fn with_indices(mut self, indices: IndexBuffer) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Translation applied on top of every previously registered mesh's offset.
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Rotates this mesh (only) by the frame rotation around `axis`.
    pub fn with_spin(mut self, axis: Vec3) -> Self {
        self.spin = Some(axis);
        self
    }

    pub fn positions(&self) -> &GeometryBuffer {
        &self.positions
    }

    pub fn indices(&self) -> Option<&IndexBuffer> {
        self.indices.as_ref()
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn spin(&self) -> Option<Vec3> {
        self.spin
    }

    /// Releases every buffer the mesh holds.
    pub fn destroy<B: Backend>(self, ctx: &mut GraphicsContext<B>) {
        self.positions.destroy(ctx);
        for (_, buffer) in self.attributes {
            buffer.destroy(ctx);
        }
        if let Some(indices) = self.indices {
            indices.destroy(ctx);
        }
    }
}
