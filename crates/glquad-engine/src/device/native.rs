use std::ffi::{c_void, CStr};

use glow::HasContext;

use super::api::{BufferTarget, GlApi, IndexType, Primitive, ShaderStage};

/// [`GlApi`] backed by a real driver through `glow`.
pub struct GlowDevice {
    gl: glow::Context,
}

impl GlowDevice {
    /// Loads GL entry points through `loader`.
    ///
    /// # Safety
    /// The context the loader resolves against must be current on this thread
    /// and must outlive the returned device. Every method of the device relies
    /// on that.
    pub unsafe fn from_loader<F>(loader: F) -> Self
    where
        F: FnMut(&CStr) -> *const c_void,
    {
        let gl = unsafe { glow::Context::from_loader_function_cstr(loader) };
        Self { gl }
    }
}

// SAFETY (all methods): `from_loader` guarantees a current context for the
// lifetime of `self`; arguments are plain values or handles created by it.
impl GlApi for GlowDevice {
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Shader = glow::Shader;
    type Program = glow::Program;
    type UniformLocation = glow::UniformLocation;

    fn get_error(&self) -> u32 {
        unsafe { self.gl.get_error() }
    }

    fn create_buffer(&self) -> Result<glow::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<glow::Buffer>) {
        unsafe { self.gl.bind_buffer(target.to_gl(), buffer) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(target.to_gl(), data, glow::STATIC_DRAW)
        }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn buffer_binding(&self, target: BufferTarget) -> Option<glow::Buffer> {
        let raw = unsafe { self.gl.get_parameter_i32(target.binding_query()) };
        std::num::NonZeroU32::new(raw as u32).map(glow::NativeBuffer)
    }

    fn create_vertex_array(&self) -> Result<glow::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vertex_array: Option<glow::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: glow::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset)
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<glow::Shader, String> {
        unsafe { self.gl.create_shader(stage.to_gl()) }
    }

    fn shader_source(&self, shader: glow::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: glow::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: glow::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: glow::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<glow::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: glow::Program, shader: glow::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn link_program(&self, program: glow::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: glow::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn validate_program(&self, program: glow::Program) {
        unsafe { self.gl.validate_program(program) }
    }

    fn program_info_log(&self, program: glow::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn use_program(&self, program: Option<glow::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn delete_program(&self, program: glow::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(&self, program: glow::Program, name: &str) -> Option<glow::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_4_f32(&self, location: Option<&glow::UniformLocation>, value: [f32; 4]) {
        let [x, y, z, w] = value;
        unsafe { self.gl.uniform_4_f32(location, x, y, z, w) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba;
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear_color_buffer(&self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT) }
    }

    fn draw_elements(&self, mode: Primitive, count: i32, index_type: IndexType, offset: i32) {
        unsafe {
            self.gl
                .draw_elements(mode.to_gl(), count, index_type.to_gl(), offset)
        }
    }

    fn version_string(&self) -> String {
        unsafe { self.gl.get_parameter_string(glow::VERSION) }
    }

    fn max_vertex_attribs(&self) -> i32 {
        unsafe { self.gl.get_parameter_i32(glow::MAX_VERTEX_ATTRIBS) }
    }
}
