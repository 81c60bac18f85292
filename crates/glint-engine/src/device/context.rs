use crate::error::{RenderError, Result};
use crate::paint::Color;
use crate::shader::ProgramDesc;

use super::{
    AttributeSlot, Backend, BufferId, BufferKind, ContextConfig, FrameStatus, ProgramId, Surface,
    Topology, UniformSlot,
};

/// Owns the rendering context of one surface.
///
/// This type is the single entry point for GPU state:
/// - acquired once per surface, configured once at acquisition
/// - passed by `&mut` to every component that creates or draws resources
/// - dropping it drops the backend and every resource the backend still holds
///
/// All binding state is global to the context. Activating a program forgets
/// the previous program's bindings; callers rebind buffers before each draw.
pub struct GraphicsContext<B: Backend> {
    backend: B,
    config: ContextConfig,
    active_program: Option<ProgramId>,
    in_frame: bool,
}

impl<B: Backend> GraphicsContext<B> {
    /// Acquires a context from `surface` and applies `config`.
    pub fn acquire<S>(surface: S, config: ContextConfig) -> Result<Self>
    where
        S: Surface<Backend = B>,
    {
        let mut backend = surface
            .acquire(&config)
            .map_err(|e| RenderError::ContextUnavailable {
                reason: format!("{e:#}"),
            })?;

        backend.configure(&config);

        log::info!(
            "graphics context acquired (clear color {:?}, depth test {})",
            config.clear_color.to_array(),
            config.depth_test
        );

        Ok(Self {
            backend,
            config,
            active_program: None,
            in_frame: false,
        })
    }

    /// Returns the configured clear color.
    pub fn clear_color(&self) -> Color {
        self.config.clear_color
    }

    /// Returns whether depth testing was enabled at acquisition.
    pub fn depth_test_enabled(&self) -> bool {
        self.config.depth_test
    }

    /// Returns the program made current by the last `use_program`, if any.
    pub fn active_program(&self) -> Option<ProgramId> {
        self.active_program
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Forwards a surface size change (physical pixels).
    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
    }

    /// Starts a frame.
    ///
    /// `Ok(FrameStatus::Skipped)` means nothing should be drawn this tick.
    /// `Err(RenderError::SurfaceLost)` is fatal for the frame loop.
    pub fn begin_frame(&mut self) -> Result<FrameStatus> {
        let status = self.backend.begin_frame()?;
        self.in_frame = status == FrameStatus::Ready;
        Ok(status)
    }

    /// Clears color and depth using the configured clear color.
    pub fn clear(&mut self) {
        self.backend.clear();
    }

    /// Finishes and presents the current frame.
    pub fn end_frame(&mut self) -> Result<()> {
        if !self.in_frame {
            return Ok(());
        }
        self.in_frame = false;
        self.backend.end_frame()
    }

    pub(crate) fn create_program(&mut self, desc: &ProgramDesc<'_>) -> std::result::Result<ProgramId, String> {
        self.backend.create_program(desc)
    }

    pub(crate) fn destroy_program(&mut self, id: ProgramId) {
        if self.active_program == Some(id) {
            self.active_program = None;
        }
        self.backend.destroy_program(id);
    }

    pub(crate) fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> BufferId {
        self.backend.create_buffer(kind, contents)
    }

    pub(crate) fn destroy_buffer(&mut self, id: BufferId) {
        self.backend.destroy_buffer(id);
    }

    pub(crate) fn use_program(&mut self, id: ProgramId) {
        self.active_program = Some(id);
        self.backend.use_program(id);
    }

    pub(crate) fn bind_attribute(&mut self, slot: AttributeSlot, buffer: BufferId, components: u32) {
        self.backend.bind_attribute(slot, buffer, components);
    }

    pub(crate) fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.backend.bind_index_buffer(buffer);
    }

    pub(crate) fn set_uniform_mat4(&mut self, slot: UniformSlot, value: [f32; 16]) {
        self.backend.set_uniform_mat4(slot, value);
    }

    /// Issues a non-indexed draw.
    ///
    /// Precondition: a program is active. Violations are logged and dropped.
    pub(crate) fn draw(&mut self, topology: Topology, vertex_count: u32) {
        if self.has_program_for_draw() {
            self.backend.draw(topology, vertex_count);
        }
    }

    /// Issues an indexed draw using the bound index buffer.
    ///
    /// Precondition: a program is active. Violations are logged and dropped.
    pub(crate) fn draw_indexed(&mut self, topology: Topology, index_count: u32) {
        if self.has_program_for_draw() {
            self.backend.draw_indexed(topology, index_count);
        }
    }

    fn has_program_for_draw(&self) -> bool {
        if self.active_program.is_none() {
            log::error!("draw issued with no active program; dropped");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{HeadlessSurface, RecordedCommand};

    #[test]
    fn acquire_applies_config_once() {
        let config = ContextConfig {
            clear_color: Color::new(0.1, 0.2, 0.3, 1.0),
            depth_test: false,
        };
        let ctx = GraphicsContext::acquire(HeadlessSurface::new(), config).unwrap();

        assert_eq!(ctx.clear_color(), Color::new(0.1, 0.2, 0.3, 1.0));
        assert!(!ctx.depth_test_enabled());

        let configures = ctx
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, RecordedCommand::Configure { .. }))
            .count();
        assert_eq!(configures, 1);
    }

    #[test]
    fn unavailable_surface_reports_context_unavailable() {
        let err = GraphicsContext::acquire(
            HeadlessSurface::unavailable("no adapter"),
            ContextConfig::default(),
        )
        .err()
        .unwrap();

        match err {
            RenderError::ContextUnavailable { reason } => assert!(reason.contains("no adapter")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn draw_without_program_is_dropped() {
        let mut ctx = GraphicsContext::acquire(HeadlessSurface::new(), ContextConfig::default()).unwrap();
        ctx.begin_frame().unwrap();
        ctx.draw(Topology::TriangleList, 3);
        ctx.end_frame().unwrap();

        assert_eq!(ctx.backend().draw_calls().count(), 0);
    }

    #[test]
    fn end_frame_without_begin_is_noop() {
        let mut ctx = GraphicsContext::acquire(HeadlessSurface::new(), ContextConfig::default()).unwrap();
        ctx.end_frame().unwrap();
        assert!(!ctx
            .backend()
            .commands()
            .iter()
            .any(|c| matches!(c, RecordedCommand::EndFrame)));
    }
}
