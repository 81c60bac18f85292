//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, acquires a wgpu-backed
//! `GraphicsContext` for it and drives a `FrameLoop` from redraw events.

mod runtime;

pub use runtime::{App, RedrawScheduler, Runtime, RuntimeConfig, WindowContext};
