//! Window + frame loop.
//!
//! Owns the `winit` event loop and drives the application through the
//! `Uninitialized -> Running -> Terminated` lifecycle.

mod runtime;

pub use runtime::Runtime;
