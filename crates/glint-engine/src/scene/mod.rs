//! Scene composition.
//!
//! Responsibilities:
//! - own one program and the meshes drawn with it
//! - keep registration order as draw order
//! - compose each mesh's model-view from accumulated offsets and its spin

mod compose;
mod mesh;

pub use compose::{Scene, SceneBindings};
pub use mesh::Mesh;
