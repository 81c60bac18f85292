//! GPU backend (wgpu).
//!
//! This module is responsible for:
//! - adapter/device acquisition and swapchain configuration for a winit window
//! - turning linked programs into shader modules and bind-group layouts
//! - caching render pipelines per draw shape and encoding each frame in one pass

mod gpu;
mod init;
mod pipeline;
mod surface;

pub use gpu::WgpuBackend;
pub use init::GpuInit;
pub use surface::WgpuSurface;
