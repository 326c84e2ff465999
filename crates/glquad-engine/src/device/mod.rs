//! GL device + window context management.
//!
//! This module is responsible for:
//! - the [`GlApi`] seam every GPU object is written against
//! - a driver-backed implementation ([`GlowDevice`]) and, behind the
//!   `headless` feature, a software one (`HeadlessGl`)
//! - creating the window, GL context and surface, and presenting frames ([`GlContext`])

mod api;
mod context;
#[cfg(any(test, feature = "headless"))]
mod headless;
mod init;
mod native;

pub use api::{BufferTarget, GlApi, IndexType, Primitive, ShaderStage};
pub use context::GlContext;
#[cfg(any(test, feature = "headless"))]
pub use headless::{AttribState, DrawRecord, Handle, HeadlessGl, UniformSlot};
pub use init::ContextConfig;
pub use native::GlowDevice;
