//! Time subsystem.
//!
//! One `FrameClock` per frame loop; call `tick()` once per presented frame.
//! `FrameTime::elapsed` is the wall-clock input for animated uniforms.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
