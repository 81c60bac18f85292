//! Shader programs.
//!
//! Sources are WGSL, one string per stage. Each stage is parsed and validated
//! on its own, the pair is then linked (fragment inputs must be written by the
//! vertex stage, uniforms are `mat4x4<f32>` in group 0) and the names a call
//! site declares are resolved to slots exactly once.

mod layout;
mod program;
mod reflect;
mod stage;

pub use layout::{DeclaredName, ProgramLayout};
pub use program::{Attribute, ShaderProgram};
pub use reflect::{AttributeInfo, ProgramDesc, UniformInfo};
pub use stage::ShaderStage;
