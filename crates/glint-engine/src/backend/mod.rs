//! `Backend` implementations.
//!
//! - `wgpu`: renders to a window
//! - `headless`: records calls, needs no display

pub mod headless;
pub mod wgpu;
