//! Frame timing.
//!
//! One `FrameClock` per frame loop; `tick()` once per host frame yields the
//! `FrameTime` the loop accumulates rotation from.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
