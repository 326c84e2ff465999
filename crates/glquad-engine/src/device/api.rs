use std::fmt::{self, Debug};

/// Buffer binding points used by the engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// `GL_ARRAY_BUFFER`: vertex data.
    Array,
    /// `GL_ELEMENT_ARRAY_BUFFER`: index data.
    ElementArray,
}

impl BufferTarget {
    #[inline]
    pub const fn to_gl(self) -> u32 {
        match self {
            BufferTarget::Array => glow::ARRAY_BUFFER,
            BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        }
    }

    /// The matching `*_BINDING` query enum.
    #[inline]
    pub const fn binding_query(self) -> u32 {
        match self {
            BufferTarget::Array => glow::ARRAY_BUFFER_BINDING,
            BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER_BINDING,
        }
    }
}

/// Shader pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    #[inline]
    pub const fn to_gl(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primitive topology for draw calls.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Primitive {
    Triangles,
}

impl Primitive {
    #[inline]
    pub const fn to_gl(self) -> u32 {
        match self {
            Primitive::Triangles => glow::TRIANGLES,
        }
    }
}

/// Element type stored in an index buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexType {
    U32,
}

impl IndexType {
    #[inline]
    pub const fn to_gl(self) -> u32 {
        match self {
            IndexType::U32 => glow::UNSIGNED_INT,
        }
    }

    #[inline]
    pub const fn size(self) -> usize {
        match self {
            IndexType::U32 => 4,
        }
    }
}

/// The subset of OpenGL the engine issues.
///
/// Every GPU wrapper is generic over this trait, so the same code drives the
/// real driver ([`GlowDevice`](super::GlowDevice)) and the software tracker
/// (`HeadlessGl`, behind the `headless` feature).
///
/// Implementations assume their context is current on the calling thread for
/// as long as the value exists. Methods mirror the GL entry point of the same
/// name; failures on the GL side are reported through [`get_error`](Self::get_error),
/// not through return values.
pub trait GlApi {
    type Buffer: Copy + Eq + Debug;
    type VertexArray: Copy + Eq + Debug;
    type Shader: Copy + Eq + Debug;
    type Program: Copy + Eq + Debug;
    type UniformLocation: Clone + Debug;

    /// Pops one pending error flag (`glow::NO_ERROR` when none is set).
    fn get_error(&self) -> u32;

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    fn buffer_data(&self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&self, buffer: Self::Buffer);
    /// Buffer currently bound to `target`, if any.
    fn buffer_binding(&self, target: BufferTarget) -> Option<Self::Buffer>;

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn validate_program(&self, program: Self::Program);
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);

    fn uniform_location(&self, program: Self::Program, name: &str)
    -> Option<Self::UniformLocation>;
    fn uniform_4_f32(&self, location: Option<&Self::UniformLocation>, value: [f32; 4]);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, rgba: [f32; 4]);
    fn clear_color_buffer(&self);
    fn draw_elements(&self, mode: Primitive, count: i32, index_type: IndexType, offset: i32);

    /// `glGetString(GL_VERSION)`.
    fn version_string(&self) -> String;
    /// `glGetIntegerv(GL_MAX_VERTEX_ATTRIBS)`.
    fn max_vertex_attribs(&self) -> i32;
}
