use crate::device::{AttributeSlot, Backend, FrameStatus, GraphicsContext, UniformSlot};
use crate::error::{RenderError, Result};
use crate::geometry::GeometryBuffer;
use crate::shader::ShaderProgram;
use crate::transform::Transform;

use super::Mesh;

/// Names the scene looks up on its program.
///
/// All three must be declared (as required or optional) in the program's
/// `ProgramLayout` and present in the shaders.
#[derive(Debug, Clone)]
pub struct SceneBindings {
    pub position: String,
    pub model_view: String,
    pub projection: String,
}

impl Default for SceneBindings {
    fn default() -> Self {
        Self {
            position: "a_position".to_string(),
            model_view: "u_model_view".to_string(),
            projection: "u_projection".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct SceneSlots {
    position: AttributeSlot,
    model_view: UniformSlot,
    projection: UniformSlot,
}

#[derive(Debug)]
struct Registered {
    mesh: Mesh,
    /// Slots of `mesh.attributes`, same order.
    attribute_slots: Vec<AttributeSlot>,
}

/// One program, its meshes and the transforms they are drawn with.
///
/// Meshes draw in registration order. Offsets accumulate: each mesh is
/// translated by its own offset on top of the offsets of every mesh before
/// it, starting from the scene's view transform. Spin is per mesh and does not
/// carry over.
///
/// The scene owns its program and buffers; `destroy` releases them.
#[derive(Debug)]
pub struct Scene {
    program: ShaderProgram,
    slots: SceneSlots,
    projection: Transform,
    view: Transform,
    meshes: Vec<Registered>,
}

impl Scene {
    /// Creates a scene using the default `SceneBindings` names.
    pub fn new<B: Backend>(ctx: &mut GraphicsContext<B>, program: ShaderProgram, projection: Transform) -> Result<Self> {
        Self::with_bindings(ctx, program, projection, &SceneBindings::default())
    }

    /// Creates a scene that owns `program`.
    ///
    /// If a binding name does not resolve, `program` is destroyed before the
    /// error is returned.
    pub fn with_bindings<B: Backend>(
        ctx: &mut GraphicsContext<B>,
        program: ShaderProgram,
        projection: Transform,
        bindings: &SceneBindings,
    ) -> Result<Self> {
        let slots = match resolve_slots(&program, bindings) {
            Ok(slots) => slots,
            Err(err) => {
                program.destroy(ctx);
                return Err(err);
            }
        };

        Ok(Self {
            program,
            slots,
            projection,
            view: Transform::identity(),
            meshes: Vec::new(),
        })
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn projection(&self) -> Transform {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Transform) {
        self.projection = projection;
    }

    /// Transform every mesh offset accumulates onto. Identity by default.
    pub fn set_view(&mut self, view: Transform) {
        self.view = view;
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index).map(|r| &r.mesh)
    }

    /// Registers `mesh` after all previous ones and returns its index.
    ///
    /// Extra attribute names are resolved here; buffers must carry 1..=4
    /// components and as many items as the positions. Every vertex input of the
    /// program must be fed by the mesh. A rejected mesh is destroyed.
    pub fn add<B: Backend>(&mut self, ctx: &mut GraphicsContext<B>, mesh: Mesh) -> Result<usize> {
        match self.attribute_slots(&mesh) {
            Ok(attribute_slots) => {
                self.meshes.push(Registered { mesh, attribute_slots });
                Ok(self.meshes.len() - 1)
            }
            Err(err) => {
                mesh.destroy(ctx);
                Err(err)
            }
        }
    }

    fn attribute_slots(&self, mesh: &Mesh) -> Result<Vec<AttributeSlot>> {
        check_components("position", &mesh.positions)?;

        let expected = mesh.positions.item_count();
        let mut attribute_slots = Vec::with_capacity(mesh.attributes.len());
        for (name, buffer) in &mesh.attributes {
            check_components(name, buffer)?;
            if buffer.item_count() != expected {
                return Err(RenderError::VertexCountMismatch {
                    attribute: name.clone(),
                    expected,
                    actual: buffer.item_count(),
                });
            }
            let attribute = self
                .program
                .attribute(name)
                .ok_or_else(|| RenderError::AttributeNotFound { name: name.clone() })?;
            attribute_slots.push(attribute.slot);
        }

        // Every vertex input of the program takes a buffer from this mesh.
        for (name, slot) in self.program.vertex_inputs() {
            if slot != self.slots.position && !attribute_slots.contains(&slot) {
                return Err(RenderError::AttributeNotBound { name: name.to_string() });
            }
        }

        Ok(attribute_slots)
    }

    /// Model-view matrix mesh `index` is drawn with at `rotation`.
    pub fn model_view(&self, index: usize, rotation: f32) -> Option<Transform> {
        self.model_views(rotation).nth(index)
    }

    /// Draws one complete frame: begin, clear, every mesh, end.
    ///
    /// A skipped frame draws nothing and is not an error.
    pub fn render<B: Backend>(&self, ctx: &mut GraphicsContext<B>, rotation: f32) -> Result<()> {
        if ctx.begin_frame()? == FrameStatus::Skipped {
            log::debug!("frame skipped by surface");
            return Ok(());
        }
        ctx.clear();
        self.draw(ctx, rotation);
        ctx.end_frame()
    }

    /// Issues the scene's draw sequence into the current frame.
    pub fn draw<B: Backend>(&self, ctx: &mut GraphicsContext<B>, rotation: f32) {
        self.program.activate(ctx);

        let projection = self.projection.to_cols_array();
        for (registered, model_view) in self.meshes.iter().zip(self.model_views(rotation)) {
            let mesh = &registered.mesh;

            mesh.positions.bind(ctx, self.slots.position);
            for ((_, buffer), slot) in mesh.attributes.iter().zip(&registered.attribute_slots) {
                buffer.bind(ctx, *slot);
            }

            ctx.set_uniform_mat4(self.slots.projection, projection);
            ctx.set_uniform_mat4(self.slots.model_view, model_view.to_cols_array());

            match &mesh.indices {
                Some(indices) => {
                    indices.bind(ctx);
                    ctx.draw_indexed(mesh.topology, indices.count());
                }
                None => ctx.draw(mesh.topology, mesh.positions.item_count()),
            }
        }
    }

    /// Releases the program and every buffer the scene owns.
    pub fn destroy<B: Backend>(self, ctx: &mut GraphicsContext<B>) {
        for Registered { mesh, .. } in self.meshes {
            mesh.destroy(ctx);
        }
        self.program.destroy(ctx);
    }

    fn model_views(&self, rotation: f32) -> impl Iterator<Item = Transform> + '_ {
        self.meshes.iter().scan(self.view, move |acc, registered| {
            *acc = acc.translate(registered.mesh.offset);
            Some(match registered.mesh.spin {
                Some(axis) => acc.rotate(rotation, axis),
                None => *acc,
            })
        })
    }
}

fn resolve_slots(program: &ShaderProgram, bindings: &SceneBindings) -> Result<SceneSlots> {
    let position = program
        .attribute(&bindings.position)
        .ok_or_else(|| RenderError::AttributeNotFound {
            name: bindings.position.clone(),
        })?
        .slot;
    let model_view = program
        .uniform(&bindings.model_view)
        .ok_or_else(|| RenderError::UniformNotFound {
            name: bindings.model_view.clone(),
        })?;
    let projection = program
        .uniform(&bindings.projection)
        .ok_or_else(|| RenderError::UniformNotFound {
            name: bindings.projection.clone(),
        })?;

    Ok(SceneSlots {
        position,
        model_view,
        projection,
    })
}

fn check_components(name: &str, buffer: &GeometryBuffer) -> Result<()> {
    if (1..=4).contains(&buffer.item_size()) {
        Ok(())
    } else {
        Err(RenderError::UnsupportedComponents {
            attribute: name.to_string(),
            components: buffer.item_size(),
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::backend::headless::{HeadlessBackend, HeadlessSurface, RecordedCommand};
    use crate::device::{ContextConfig, Topology};
    use crate::geometry::IndexBuffer;
    use crate::shader::ProgramLayout;

    const VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> u_model_view: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_projection: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) a_position: vec3<f32>, @location(1) a_color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u_projection * u_model_view * vec4<f32>(a_position, 1.0);
    out.color = a_color;
    return out;
}
"#;

    const FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

    fn ctx() -> GraphicsContext<HeadlessBackend> {
        GraphicsContext::acquire(HeadlessSurface::new(), ContextConfig::default()).unwrap()
    }

    fn layout() -> ProgramLayout {
        ProgramLayout::new()
            .attribute("a_position")
            .attribute("a_color")
            .uniform("u_model_view")
            .uniform("u_projection")
    }

    fn scene(ctx: &mut GraphicsContext<HeadlessBackend>) -> Scene {
        let program = ShaderProgram::compile(ctx, VERTEX, FRAGMENT, &layout()).unwrap();
        Scene::new(ctx, program, Transform::identity()).unwrap()
    }

    fn triangle(ctx: &mut GraphicsContext<HeadlessBackend>) -> GeometryBuffer {
        GeometryBuffer::upload(ctx, &[0.0, 1.0, 0.0, -1.0, -1.0, 0.0, 1.0, -1.0, 0.0], 3).unwrap()
    }

    /// Mesh over `positions` with one white color per vertex.
    fn colored(ctx: &mut GraphicsContext<HeadlessBackend>, positions: GeometryBuffer, topology: Topology) -> Mesh {
        let colors = vec![1.0; positions.item_count() as usize * 4];
        let colors = GeometryBuffer::upload(ctx, &colors, 4).unwrap();
        Mesh::new(positions, topology).with_attribute("a_color", colors)
    }

    #[test]
    fn missing_scene_uniform_is_reported_and_program_released() {
        let mut ctx = ctx();
        let layout = ProgramLayout::new().attribute("a_position").uniform("u_model_view");
        let program = ShaderProgram::compile(&mut ctx, VERTEX, FRAGMENT, &layout).unwrap();
        assert_eq!(ctx.backend().program_count(), 1);

        let err = Scene::new(&mut ctx, program, Transform::identity()).unwrap_err();
        assert_eq!(
            err,
            RenderError::UniformNotFound {
                name: "u_projection".into()
            }
        );
        assert_eq!(ctx.backend().program_count(), 0);
    }

    #[test]
    fn attribute_buffers_must_match_vertex_count() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let positions = triangle(&mut ctx);
        let colors = GeometryBuffer::upload(&mut ctx, &[1.0; 8], 4).unwrap();

        let err = scene
            .add(&mut ctx, Mesh::new(positions, Topology::TriangleList).with_attribute("a_color", colors))
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::VertexCountMismatch {
                attribute: "a_color".into(),
                expected: 3,
                actual: 2
            }
        );
        assert!(scene.is_empty());
    }

    #[test]
    fn rejected_mesh_releases_its_buffers() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let positions = triangle(&mut ctx);
        let colors = GeometryBuffer::upload(&mut ctx, &[1.0; 8], 4).unwrap();
        let indices = IndexBuffer::upload(&mut ctx, &[0, 1, 2]).unwrap();
        assert_eq!(ctx.backend().buffer_count(), 3);

        let mesh = Mesh::new(positions, Topology::TriangleList)
            .with_attribute("a_color", colors)
            .with_indices(indices);
        assert!(scene.add(&mut ctx, mesh).is_err());
        assert_eq!(ctx.backend().buffer_count(), 0);

        scene.destroy(&mut ctx);
        assert_eq!(ctx.backend().program_count(), 0);
    }

    #[test]
    fn unknown_attribute_is_rejected_at_registration() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let positions = triangle(&mut ctx);
        let normals = triangle(&mut ctx);

        let err = scene
            .add(&mut ctx, Mesh::new(positions, Topology::TriangleList).with_attribute("a_normal", normals))
            .unwrap_err();
        assert_eq!(err, RenderError::AttributeNotFound { name: "a_normal".into() });
    }

    #[test]
    fn mesh_must_feed_every_vertex_input() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let first = triangle(&mut ctx);
        let first = colored(&mut ctx, first, Topology::TriangleList);
        scene.add(&mut ctx, first).unwrap();

        // Positions only, five vertices.
        let bare = GeometryBuffer::upload(&mut ctx, &[0.0; 15], 3).unwrap();
        let err = scene.add(&mut ctx, Mesh::new(bare, Topology::TriangleStrip)).unwrap_err();

        assert_eq!(err, RenderError::AttributeNotBound { name: "a_color".into() });
        assert_eq!(scene.len(), 1);
        assert_eq!(ctx.backend().buffer_count(), 2);
    }

    #[test]
    fn inputs_left_out_of_the_layout_still_need_a_buffer() {
        let mut ctx = ctx();
        let layout = ProgramLayout::new()
            .attribute("a_position")
            .uniform("u_model_view")
            .uniform("u_projection");
        let program = ShaderProgram::compile(&mut ctx, VERTEX, FRAGMENT, &layout).unwrap();
        let mut scene = Scene::new(&mut ctx, program, Transform::identity()).unwrap();

        let positions = triangle(&mut ctx);
        let err = scene.add(&mut ctx, Mesh::new(positions, Topology::TriangleList)).unwrap_err();
        assert_eq!(err, RenderError::AttributeNotBound { name: "a_color".into() });
    }

    #[test]
    fn wide_items_are_rejected() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let positions = GeometryBuffer::upload(&mut ctx, &[0.0; 10], 5).unwrap();

        let err = scene.add(&mut ctx, Mesh::new(positions, Topology::TriangleList)).unwrap_err();
        assert_eq!(
            err,
            RenderError::UnsupportedComponents {
                attribute: "position".into(),
                components: 5
            }
        );
    }

    #[test]
    fn spin_applies_to_its_mesh_only() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let first = triangle(&mut ctx);
        let first = colored(&mut ctx, first, Topology::TriangleList);
        let second = triangle(&mut ctx);
        let second = colored(&mut ctx, second, Topology::TriangleList);

        scene
            .add(&mut ctx, first.with_offset(Vec3::new(0.0, 0.0, -7.0)).with_spin(Vec3::Y))
            .unwrap();
        scene
            .add(&mut ctx, second.with_offset(Vec3::new(3.0, 0.0, 0.0)))
            .unwrap();

        let spun = scene.model_view(0, 1.0).unwrap();
        assert!(spun.abs_diff_eq(
            Transform::from_translation(Vec3::new(0.0, 0.0, -7.0)).rotate(1.0, Vec3::Y),
            1e-6
        ));

        let still = scene.model_view(1, 1.0).unwrap();
        assert!(still.abs_diff_eq(Transform::from_translation(Vec3::new(3.0, 0.0, -7.0)), 1e-6));
        assert!(scene.model_view(2, 1.0).is_none());
    }

    #[test]
    fn indexed_mesh_issues_one_indexed_draw() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let positions = GeometryBuffer::upload(&mut ctx, &[0.0; 12], 3).unwrap();
        let indices = IndexBuffer::upload(&mut ctx, &[0, 1, 2, 0, 2, 3]).unwrap();
        let index_id = indices.id();

        let mesh = colored(&mut ctx, positions, Topology::TriangleList).with_indices(indices);
        scene.add(&mut ctx, mesh).unwrap();
        scene.render(&mut ctx, 0.0).unwrap();

        let draws: Vec<_> = ctx.backend().draw_calls().collect();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].indexed, Some(index_id));
        assert_eq!(draws[0].count, 6);
        assert!(ctx.backend().commands().contains(&RecordedCommand::DrawIndexed {
            topology: Topology::TriangleList,
            count: 6
        }));
    }

    #[test]
    fn skipped_frame_draws_nothing() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let positions = triangle(&mut ctx);
        let mesh = colored(&mut ctx, positions, Topology::TriangleList);
        scene.add(&mut ctx, mesh).unwrap();

        ctx.backend_mut().skip_next_frame();
        scene.render(&mut ctx, 0.0).unwrap();
        assert_eq!(ctx.backend().draw_calls().count(), 0);
        assert!(!ctx.backend().commands().contains(&RecordedCommand::EndFrame));

        scene.render(&mut ctx, 0.0).unwrap();
        assert_eq!(ctx.backend().draw_calls().count(), 1);
    }

    #[test]
    fn destroy_releases_program_and_buffers() {
        let mut ctx = ctx();
        let mut scene = scene(&mut ctx);
        let positions = triangle(&mut ctx);
        let mesh = colored(&mut ctx, positions, Topology::TriangleList);
        scene.add(&mut ctx, mesh).unwrap();

        assert_eq!(ctx.backend().buffer_count(), 2);
        scene.destroy(&mut ctx);
        assert_eq!(ctx.backend().buffer_count(), 0);
        assert_eq!(ctx.backend().program_count(), 0);
        assert_eq!(ctx.active_program(), None);
    }
}
