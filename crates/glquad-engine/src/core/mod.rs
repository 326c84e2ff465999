//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and the application:
//! the `App` trait, its per-frame context and the loop lifecycle states.

mod app;
mod ctx;

pub use app::{App, AppControl, LoopState};
pub use ctx::FrameCtx;
