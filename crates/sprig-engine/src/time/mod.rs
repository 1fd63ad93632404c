//! Frame timing.
//!
//! The renderer owns one `FrameClock` and ticks it in `start_render`, handing
//! the caller the elapsed time since the previous frame boundary.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
