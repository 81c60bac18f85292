//! Display-free backend that records every call.
//!
//! Used by test harnesses to assert on draw sequences and failure paths
//! without a window or GPU. Programs and buffers only exist as bookkeeping.

use std::collections::{BTreeMap, HashMap};

use anyhow::anyhow;

use crate::device::{
    AttributeSlot, Backend, BufferId, BufferKind, ContextConfig, FrameStatus, ProgramId, Surface, Topology,
    UniformSlot,
};
use crate::error::RenderError;
use crate::paint::Color;
use crate::shader::ProgramDesc;

/// Surface stand-in for `HeadlessBackend`.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    failure: Option<String>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose context acquisition fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
        }
    }
}

impl Surface for HeadlessSurface {
    type Backend = HeadlessBackend;

    fn acquire(self, _config: &ContextConfig) -> anyhow::Result<HeadlessBackend> {
        match self.failure {
            Some(reason) => Err(anyhow!(reason).context("headless surface refused a context")),
            None => Ok(HeadlessBackend::default()),
        }
    }
}

/// One backend call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Configure { clear_color: Color, depth_test: bool },
    CreateProgram(ProgramId),
    DestroyProgram(ProgramId),
    CreateBuffer { id: BufferId, kind: BufferKind, bytes: usize },
    DestroyBuffer(BufferId),
    BeginFrame,
    Clear { color: Color, depth: bool },
    UseProgram(ProgramId),
    BindAttribute { slot: AttributeSlot, buffer: BufferId, components: u32 },
    BindIndexBuffer(BufferId),
    SetUniform { slot: UniformSlot, value: [f32; 16] },
    Draw { topology: Topology, count: u32 },
    DrawIndexed { topology: Topology, count: u32 },
    EndFrame,
    Resize { width: u32, height: u32 },
}

/// A draw together with the binding state it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub frame: u64,
    pub program: ProgramId,
    pub topology: Topology,
    pub count: u32,
    pub indexed: Option<BufferId>,
    pub attributes: BTreeMap<AttributeSlot, (BufferId, u32)>,
    pub uniforms: BTreeMap<UniformSlot, [f32; 16]>,
}

#[derive(Debug, Default)]
struct Bindings {
    program: Option<ProgramId>,
    attributes: BTreeMap<AttributeSlot, (BufferId, u32)>,
    index: Option<BufferId>,
    uniforms: BTreeMap<UniformSlot, [f32; 16]>,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    config: Option<ContextConfig>,
    next_id: u32,
    programs: HashMap<ProgramId, usize>,
    buffers: HashMap<BufferId, (BufferKind, usize)>,
    bindings: Bindings,
    commands: Vec<RecordedCommand>,
    draws: Vec<DrawCall>,
    frames_begun: u64,
    surface_lost: bool,
    skip_next: bool,
    link_failure: Option<String>,
}

impl HeadlessBackend {
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Draws issued so far, in order.
    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.draws.iter()
    }

    /// Draws issued during frame `frame` (frames count from 0).
    pub fn draws_in_frame(&self, frame: u64) -> impl Iterator<Item = &DrawCall> {
        self.draws.iter().filter(move |d| d.frame == frame)
    }

    pub fn frames_begun(&self) -> u64 {
        self.frames_begun
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Byte length of a live buffer.
    pub fn buffer_len(&self, id: BufferId) -> Option<usize> {
        self.buffers.get(&id).map(|&(_, len)| len)
    }

    /// Makes every following `begin_frame` fail with `SurfaceLost`.
    pub fn lose_surface(&mut self) {
        self.surface_lost = true;
    }

    /// Makes the next `begin_frame` report `Skipped`.
    pub fn skip_next_frame(&mut self) {
        self.skip_next = true;
    }

    /// Makes the next `create_program` fail with `log`.
    pub fn fail_next_link(&mut self, log: impl Into<String>) {
        self.link_failure = Some(log.into());
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record_draw(&mut self, topology: Topology, count: u32, indexed: bool) {
        let Some(program) = self.bindings.program else {
            log::warn!("headless draw without a program");
            return;
        };
        let index = if indexed {
            match self.bindings.index {
                Some(index) => Some(index),
                None => {
                    log::warn!("headless indexed draw without an index buffer");
                    return;
                }
            }
        } else {
            None
        };

        self.draws.push(DrawCall {
            frame: self.frames_begun.saturating_sub(1),
            program,
            topology,
            count,
            indexed: index,
            attributes: self.bindings.attributes.clone(),
            uniforms: self.bindings.uniforms.clone(),
        });
    }
}

impl Backend for HeadlessBackend {
    fn configure(&mut self, config: &ContextConfig) {
        self.commands.push(RecordedCommand::Configure {
            clear_color: config.clear_color,
            depth_test: config.depth_test,
        });
        self.config = Some(config.clone());
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, String> {
        if let Some(log) = self.link_failure.take() {
            return Err(log);
        }
        let id = ProgramId(self.next_id());
        self.programs.insert(id, desc.uniforms.len());
        self.commands.push(RecordedCommand::CreateProgram(id));
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) {
        self.programs.remove(&id);
        if self.bindings.program == Some(id) {
            self.bindings = Bindings::default();
        }
        self.commands.push(RecordedCommand::DestroyProgram(id));
    }

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> BufferId {
        let id = BufferId(self.next_id());
        self.buffers.insert(id, (kind, contents.len()));
        self.commands.push(RecordedCommand::CreateBuffer {
            id,
            kind,
            bytes: contents.len(),
        });
        id
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.buffers.remove(&id);
        self.bindings.attributes.retain(|_, (buffer, _)| *buffer != id);
        if self.bindings.index == Some(id) {
            self.bindings.index = None;
        }
        self.commands.push(RecordedCommand::DestroyBuffer(id));
    }

    fn begin_frame(&mut self) -> Result<FrameStatus, RenderError> {
        if self.surface_lost {
            return Err(RenderError::SurfaceLost);
        }
        if std::mem::take(&mut self.skip_next) {
            return Ok(FrameStatus::Skipped);
        }
        self.frames_begun += 1;
        self.commands.push(RecordedCommand::BeginFrame);
        Ok(FrameStatus::Ready)
    }

    fn clear(&mut self) {
        let (color, depth) = self
            .config
            .as_ref()
            .map_or((Color::black(), false), |c| (c.clear_color, c.depth_test));
        self.commands.push(RecordedCommand::Clear { color, depth });
    }

    fn use_program(&mut self, id: ProgramId) {
        if self.bindings.program != Some(id) {
            self.bindings = Bindings {
                program: Some(id),
                ..Bindings::default()
            };
        }
        self.commands.push(RecordedCommand::UseProgram(id));
    }

    fn bind_attribute(&mut self, slot: AttributeSlot, buffer: BufferId, components: u32) {
        self.bindings.attributes.insert(slot, (buffer, components));
        self.commands.push(RecordedCommand::BindAttribute {
            slot,
            buffer,
            components,
        });
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.bindings.index = Some(buffer);
        self.commands.push(RecordedCommand::BindIndexBuffer(buffer));
    }

    fn set_uniform_mat4(&mut self, slot: UniformSlot, value: [f32; 16]) {
        self.bindings.uniforms.insert(slot, value);
        self.commands.push(RecordedCommand::SetUniform { slot, value });
    }

    fn draw(&mut self, topology: Topology, vertex_count: u32) {
        self.commands.push(RecordedCommand::Draw {
            topology,
            count: vertex_count,
        });
        self.record_draw(topology, vertex_count, false);
    }

    fn draw_indexed(&mut self, topology: Topology, index_count: u32) {
        self.commands.push(RecordedCommand::DrawIndexed {
            topology,
            count: index_count,
        });
        self.record_draw(topology, index_count, true);
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.commands.push(RecordedCommand::EndFrame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.commands.push(RecordedCommand::Resize { width, height });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HeadlessBackend {
        HeadlessSurface::new().acquire(&ContextConfig::default()).unwrap()
    }

    #[test]
    fn switching_program_drops_bindings() {
        let mut b = backend();
        let vbo = b.create_buffer(BufferKind::Vertex, &[0; 12]);

        b.use_program(ProgramId(10));
        b.bind_attribute(AttributeSlot(0), vbo, 3);
        b.use_program(ProgramId(10));
        assert_eq!(b.bindings.attributes.len(), 1);

        b.use_program(ProgramId(11));
        assert!(b.bindings.attributes.is_empty());
    }

    #[test]
    fn rebinding_a_slot_replaces_previous_buffer() {
        let mut b = backend();
        let first = b.create_buffer(BufferKind::Vertex, &[0; 12]);
        let second = b.create_buffer(BufferKind::Vertex, &[0; 12]);

        b.begin_frame().unwrap();
        b.use_program(ProgramId(1));
        b.bind_attribute(AttributeSlot(0), first, 3);
        b.bind_attribute(AttributeSlot(0), second, 3);
        b.draw(Topology::TriangleList, 1);

        let draw = b.draw_calls().next().unwrap();
        assert_eq!(draw.attributes[&AttributeSlot(0)], (second, 3));
    }

    #[test]
    fn indexed_draw_without_index_buffer_is_not_recorded() {
        let mut b = backend();
        b.begin_frame().unwrap();
        b.use_program(ProgramId(1));
        b.draw_indexed(Topology::TriangleList, 6);
        assert_eq!(b.draw_calls().count(), 0);
    }

    #[test]
    fn lost_surface_fails_every_frame() {
        let mut b = backend();
        b.lose_surface();
        assert_eq!(b.begin_frame(), Err(RenderError::SurfaceLost));
        assert_eq!(b.begin_frame(), Err(RenderError::SurfaceLost));
    }

    #[test]
    fn skip_applies_to_one_frame() {
        let mut b = backend();
        b.skip_next_frame();
        assert_eq!(b.begin_frame(), Ok(FrameStatus::Skipped));
        assert_eq!(b.begin_frame(), Ok(FrameStatus::Ready));
        assert_eq!(b.frames_begun(), 1);
    }
}
