use thiserror::Error;

use crate::shader::ShaderStage;

/// Errors raised while building or driving a scene.
///
/// Everything except `SurfaceLost` is a construction-time failure: it aborts
/// scene setup and is handed back to the caller. None of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The surface could not produce a rendering context.
    #[error("rendering context unavailable: {reason}")]
    ContextUnavailable { reason: String },

    /// A shader stage failed to compile; `log` carries the front-end diagnostics.
    #[error("{stage} shader failed to compile:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// Both stages compiled but could not be linked into one program.
    #[error("shader program failed to link:\n{log}")]
    ShaderLink { log: String },

    /// `len` values cannot be split into whole items of `item_size` components.
    #[error("buffer of {len} values does not split into items of {item_size} components")]
    InvalidLayout { len: usize, item_size: u32 },

    #[error("required attribute `{name}` is not an input of the vertex stage")]
    AttributeNotFound { name: String },

    #[error("required uniform `{name}` is not declared by the program")]
    UniformNotFound { name: String },

    /// A mesh leaves one of the program's resolved vertex inputs without a buffer.
    #[error("attribute `{name}` is an input of the program but the mesh supplies no buffer for it")]
    AttributeNotBound { name: String },

    /// An extra attribute buffer does not feed the same number of vertices as the positions.
    #[error("attribute `{attribute}` has {actual} items, positions have {expected}")]
    VertexCountMismatch {
        attribute: String,
        expected: u32,
        actual: u32,
    },

    /// Vertex attributes carry 1 to 4 float components.
    #[error("attribute `{attribute}` has {components} components per item (1..=4 supported)")]
    UnsupportedComponents { attribute: String, components: u32 },

    /// The surface went away while the frame loop was running.
    #[error("rendering surface lost")]
    SurfaceLost,
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
