//! Rendering context and the backend seam.
//!
//! This module is responsible for:
//! - acquiring one `GraphicsContext` per surface and applying its pipeline state
//! - defining the primitive operations a backend provides (`Backend`, `Surface`)
//! - the handles and enums shared by programs, buffers and draws

mod backend;
mod context;
mod handle;
mod init;

pub use backend::{Backend, Surface};
pub use context::GraphicsContext;
pub use handle::{AttributeSlot, BufferId, BufferKind, FrameStatus, ProgramId, Topology, UniformSlot};
pub use init::ContextConfig;
