use crate::error::RenderError;
use crate::shader::ProgramDesc;

use super::{AttributeSlot, BufferId, BufferKind, ContextConfig, FrameStatus, ProgramId, Topology, UniformSlot};

/// Host capability: turns a drawable surface into a backend.
///
/// Acquisition happens once per surface; failures are reported with as much
/// context as the platform gives and are folded into
/// `RenderError::ContextUnavailable` by `GraphicsContext::acquire`.
pub trait Surface {
    type Backend: Backend;

    fn acquire(self, config: &ContextConfig) -> anyhow::Result<Self::Backend>;
}

/// Primitive GPU operations the renderer core is written against.
///
/// Binding state (`use_program`, `bind_attribute`, `bind_index_buffer`,
/// `set_uniform_mat4`) is global to the backend and consumed by the next
/// `draw`/`draw_indexed`. Draw-side calls are only meaningful between
/// `begin_frame` returning `Ready` and `end_frame`.
pub trait Backend {
    /// Applies persistent pipeline state. Called exactly once, right after acquisition.
    fn configure(&mut self, config: &ContextConfig);

    /// Creates a GPU program from two validated stages. `Err` carries the driver's link log.
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, String>;

    fn destroy_program(&mut self, id: ProgramId);

    /// Uploads immutable buffer contents.
    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> BufferId;

    fn destroy_buffer(&mut self, id: BufferId);

    fn begin_frame(&mut self) -> Result<FrameStatus, RenderError>;

    /// Clears color and depth for the current frame.
    fn clear(&mut self);

    fn use_program(&mut self, id: ProgramId);

    /// Feeds `buffer` to `slot`, `components` floats per vertex.
    fn bind_attribute(&mut self, slot: AttributeSlot, buffer: BufferId, components: u32);

    fn bind_index_buffer(&mut self, buffer: BufferId);

    /// Uploads a column-major 4x4 matrix.
    fn set_uniform_mat4(&mut self, slot: UniformSlot, value: [f32; 16]);

    fn draw(&mut self, topology: Topology, vertex_count: u32);

    fn draw_indexed(&mut self, topology: Topology, index_count: u32);

    fn end_frame(&mut self) -> Result<(), RenderError>;

    /// Surface size changed (physical pixels).
    fn resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }
}
