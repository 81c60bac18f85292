//! Per-frame draw dispatch with cancellation.

mod frame_loop;
mod scheduler;

pub use frame_loop::{FrameLoop, FrameTick, LoopHandle, LoopState, TickOutcome, DEFAULT_ANGULAR_VELOCITY};
pub use scheduler::{ManualScheduler, PausableScheduler, TickScheduler};
