//! Static vertex and index buffers.

mod buffer;

pub use buffer::{validate_layout, GeometryBuffer, IndexBuffer};
