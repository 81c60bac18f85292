use glam::Vec3;

use glint_engine::device::{Backend, GraphicsContext, Topology};
use glint_engine::geometry::{GeometryBuffer, IndexBuffer};
use glint_engine::scene::{Mesh, Scene};
use glint_engine::shader::{ProgramLayout, ShaderProgram};
use glint_engine::transform::Transform;
use glint_engine::Result;

const VERTEX_SHADER: &str = include_str!("shaders/color.vert.wgsl");
const FRAGMENT_SHADER: &str = include_str!("shaders/color.frag.wgsl");

const FOV_Y_DEGREES: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.0;

/// Which demo scene to draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SceneKind {
    /// One color-interpolated triangle.
    Triangle,
    /// Triangle and a square side by side.
    Shapes,
    /// Spinning cube with one color per face.
    Cube,
}

impl SceneKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "triangle" => Some(Self::Triangle),
            "shapes" => Some(Self::Shapes),
            "cube" => Some(Self::Cube),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Triangle => "glint: triangle",
            Self::Shapes => "glint: shapes",
            Self::Cube => "glint: cube",
        }
    }
}

pub fn projection(aspect: f32) -> Transform {
    Transform::perspective(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
}

/// Compiles the color program and registers the meshes of `kind`.
pub fn build<B: Backend>(ctx: &mut GraphicsContext<B>, kind: SceneKind, aspect: f32) -> Result<Scene> {
    let layout = ProgramLayout::new()
        .attribute("a_position")
        .attribute("a_color")
        .uniform("u_model_view")
        .uniform("u_projection");
    let program = ShaderProgram::compile(ctx, VERTEX_SHADER, FRAGMENT_SHADER, &layout)?;
    let mut scene = Scene::new(ctx, program, projection(aspect))?;

    if let Err(err) = populate(ctx, &mut scene, kind) {
        scene.destroy(ctx);
        return Err(err);
    }

    log::info!("{kind:?} scene ready ({} meshes)", scene.len());
    Ok(scene)
}

fn populate<B: Backend>(ctx: &mut GraphicsContext<B>, scene: &mut Scene, kind: SceneKind) -> Result<()> {
    match kind {
        SceneKind::Triangle => {
            let triangle = triangle(ctx)?;
            scene.add(ctx, triangle)?;
        }
        SceneKind::Shapes => {
            let triangle = triangle(ctx)?;
            scene.add(ctx, triangle)?;
            let square = square(ctx)?;
            scene.add(ctx, square)?;
        }
        SceneKind::Cube => {
            let cube = cube(ctx)?;
            scene.add(ctx, cube)?;
        }
    }
    Ok(())
}

fn triangle<B: Backend>(ctx: &mut GraphicsContext<B>) -> Result<Mesh> {
    #[rustfmt::skip]
    let positions: [f32; 9] = [
         0.0,  1.0, 0.0,
        -1.0, -1.0, 0.0,
         1.0, -1.0, 0.0,
    ];
    #[rustfmt::skip]
    let colors: [f32; 12] = [
        1.0, 0.0, 0.0, 1.0,
        0.0, 1.0, 0.0, 1.0,
        0.0, 0.0, 1.0, 1.0,
    ];

    Ok(Mesh::new(GeometryBuffer::upload(ctx, &positions, 3)?, Topology::TriangleStrip)
        .with_attribute("a_color", GeometryBuffer::upload(ctx, &colors, 4)?)
        .with_offset(Vec3::new(-1.5, 0.0, -7.0)))
}

fn square<B: Backend>(ctx: &mut GraphicsContext<B>) -> Result<Mesh> {
    #[rustfmt::skip]
    let positions: [f32; 12] = [
         1.0,  1.0, 0.0,
        -1.0,  1.0, 0.0,
         1.0, -1.0, 0.0,
        -1.0, -1.0, 0.0,
    ];
    let colors = [0.5f32, 0.5, 1.0, 1.0].repeat(4);

    // Placed relative to the triangle.
    Ok(Mesh::new(GeometryBuffer::upload(ctx, &positions, 3)?, Topology::TriangleStrip)
        .with_attribute("a_color", GeometryBuffer::upload(ctx, &colors, 4)?)
        .with_offset(Vec3::new(3.0, 0.0, 0.0)))
}

fn cube<B: Backend>(ctx: &mut GraphicsContext<B>) -> Result<Mesh> {
    #[rustfmt::skip]
    let positions: [f32; 72] = [
        // front
        -1.0, -1.0,  1.0,   1.0, -1.0,  1.0,   1.0,  1.0,  1.0,  -1.0,  1.0,  1.0,
        // back
        -1.0, -1.0, -1.0,  -1.0,  1.0, -1.0,   1.0,  1.0, -1.0,   1.0, -1.0, -1.0,
        // top
        -1.0,  1.0, -1.0,  -1.0,  1.0,  1.0,   1.0,  1.0,  1.0,   1.0,  1.0, -1.0,
        // bottom
        -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,   1.0, -1.0,  1.0,  -1.0, -1.0,  1.0,
        // right
         1.0, -1.0, -1.0,   1.0,  1.0, -1.0,   1.0,  1.0,  1.0,   1.0, -1.0,  1.0,
        // left
        -1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,  -1.0,  1.0,  1.0,  -1.0,  1.0, -1.0,
    ];

    let face_colors: [[f32; 4]; 6] = [
        [1.0, 1.0, 1.0, 1.0],
        [1.0, 0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0, 1.0],
        [0.0, 0.0, 1.0, 1.0],
        [1.0, 1.0, 0.0, 1.0],
        [1.0, 0.0, 1.0, 1.0],
    ];
    let colors: Vec<f32> = face_colors
        .iter()
        .flat_map(|c| c.repeat(4))
        .collect();

    let indices: Vec<u16> = (0..6u16)
        .flat_map(|face| {
            let v = face * 4;
            [v, v + 1, v + 2, v, v + 2, v + 3]
        })
        .collect();

    Ok(Mesh::new(GeometryBuffer::upload(ctx, &positions, 3)?, Topology::TriangleList)
        .with_attribute("a_color", GeometryBuffer::upload(ctx, &colors, 4)?)
        .with_indices(IndexBuffer::upload(ctx, &indices)?)
        .with_offset(Vec3::new(0.0, 0.0, -6.0))
        .with_spin(Vec3::new(1.0, 1.0, 0.0)))
}
