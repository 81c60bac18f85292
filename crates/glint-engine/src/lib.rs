//! Glint engine crate.
//!
//! A small WGSL renderer: one explicit `GraphicsContext` per surface, shader
//! programs with typed compile/link errors, static vertex and index buffers,
//! matrix transforms, a cancellable frame loop and a scene that draws
//! registered meshes in order.
//!
//! The GPU sits behind `device::Backend`; `backend::wgpu` renders to a winit
//! window and `backend::headless` records calls for display-free tests.

pub mod backend;
pub mod device;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod logging;
pub mod paint;
pub mod scene;
pub mod shader;
pub mod time;
pub mod transform;
pub mod window;

pub use error::{RenderError, Result};
