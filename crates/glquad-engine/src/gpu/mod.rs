//! GPU resources owned by host code.
//!
//! Every wrapper here exclusively owns one GL object, shares the device
//! through `Rc<G>`, and releases its object exactly once on drop.

mod buffer;
mod probe;
mod program;
mod vertex_array;

pub use buffer::{BufferKind, GpuBuffer, IndexBuffer, Indices, VertexBuffer, Vertices};
pub use probe::{ErrorProbe, GlError, ProbeMode};
pub use program::{
    compile_shader, CompileStatus, CompiledShader, ShaderError, ShaderPolicy, ShaderProgram,
};
pub use vertex_array::{VertexArray, VertexAttribute};
