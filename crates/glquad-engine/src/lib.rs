//! glquad engine crate.
//!
//! Owns the platform + OpenGL runtime pieces: device abstraction, GPU
//! resource wrappers, shader loading, timing, logging and the frame loop.

pub mod assets;
pub mod color;
pub mod core;
pub mod device;
pub mod gpu;
pub mod logging;
pub mod time;
pub mod window;
