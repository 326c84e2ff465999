use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;

use super::api::{BufferTarget, GlApi, IndexType, Primitive, ShaderStage};

const MAX_VERTEX_ATTRIBS: u32 = 16;

/// Object name issued by [`HeadlessGl`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Handle(NonZeroU32);

impl Handle {
    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Uniform location inside a linked headless program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot(u32);

/// One recorded `draw_elements` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub mode: Primitive,
    pub count: i32,
    pub index_type: IndexType,
    pub offset: i32,
    pub program: Handle,
}

/// Attribute state captured by `vertex_attrib_pointer_f32`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttribState {
    pub enabled: bool,
    pub size: i32,
    pub stride: i32,
    pub offset: i32,
    pub buffer: Option<Handle>,
}

impl Default for AttribState {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 4,
            stride: 0,
            offset: 0,
            buffer: None,
        }
    }
}

#[derive(Default)]
struct VertexArrayState {
    element_buffer: Option<Handle>,
    attribs: HashMap<u32, AttribState>,
}

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    info_log: String,
    pending_delete: bool,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<Handle>,
    linked: bool,
    info_log: String,
    uniforms: Vec<String>,
    values: HashMap<u32, [f32; 4]>,
}

#[derive(Default)]
struct State {
    last_name: u32,
    errors: VecDeque<u32>,

    buffers: HashMap<Handle, Vec<u8>>,
    array_binding: Option<Handle>,
    deleted_buffers: Vec<Handle>,

    vertex_arrays: HashMap<Handle, VertexArrayState>,
    bound_vertex_array: Option<Handle>,
    // Element binding while no vertex array is bound.
    loose_element_buffer: Option<Handle>,

    shaders: HashMap<Handle, ShaderObject>,
    programs: HashMap<Handle, ProgramObject>,
    current_program: Option<Handle>,

    clear_color: [f32; 4],
    clears: usize,
    viewport: [i32; 4],
    draws: Vec<DrawRecord>,
}

impl State {
    fn gen_name(&mut self) -> Result<Handle, String> {
        self.last_name = self
            .last_name
            .checked_add(1)
            .ok_or_else(|| "headless object names exhausted".to_string())?;
        NonZeroU32::new(self.last_name)
            .map(Handle)
            .ok_or_else(|| "headless object name was zero".to_string())
    }

    /// GL keeps at most one pending flag per error code.
    fn raise(&mut self, code: u32) {
        if !self.errors.contains(&code) {
            self.errors.push_back(code);
        }
    }

    fn element_slot(&mut self) -> &mut Option<Handle> {
        match self.bound_vertex_array {
            Some(vao) => &mut self
                .vertex_arrays
                .entry(vao)
                .or_default()
                .element_buffer,
            None => &mut self.loose_element_buffer,
        }
    }

    fn element_binding(&self) -> Option<Handle> {
        match self.bound_vertex_array {
            Some(vao) => self.vertex_arrays.get(&vao).and_then(|v| v.element_buffer),
            None => self.loose_element_buffer,
        }
    }

    fn binding(&self, target: BufferTarget) -> Option<Handle> {
        match target {
            BufferTarget::Array => self.array_binding,
            BufferTarget::ElementArray => self.element_binding(),
        }
    }

    fn attrib_mut(&mut self, index: u32) -> Option<&mut AttribState> {
        let vao = self.bound_vertex_array?;
        Some(
            self.vertex_arrays
                .entry(vao)
                .or_default()
                .attribs
                .entry(index)
                .or_default(),
        )
    }

    fn free_flagged_shaders(&mut self) {
        let attached: Vec<Handle> = self
            .programs
            .values()
            .flat_map(|p| p.attached.iter().copied())
            .collect();
        self.shaders
            .retain(|id, s| !s.pending_delete || attached.contains(id));
    }
}

/// Software [`GlApi`] that tracks object state and error flags without a driver.
///
/// The rules it enforces are the core-profile ones this engine can trip over:
/// unknown names, uploads or attribute setup with nothing bound, draws without
/// a vertex array or element buffer, and uniform writes with no program in
/// use. A draw with no program in use records nothing and raises nothing. Shader "compilation" accepts any non-empty source that
/// declares `main`; linking needs one compiled vertex and one compiled
/// fragment shader and assigns locations to every declared `uniform`.
#[derive(Default)]
pub struct HeadlessGl {
    state: RefCell<State>,
}

impl HeadlessGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an error flag as if the last call had failed.
    pub fn raise_error(&self, code: u32) {
        self.state.borrow_mut().raise(code);
    }

    pub fn has_pending_error(&self) -> bool {
        !self.state.borrow().errors.is_empty()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Every `delete_buffer` call, in order, including repeated ones.
    pub fn deleted_buffers(&self) -> Vec<Handle> {
        self.state.borrow().deleted_buffers.clone()
    }

    pub fn buffer_contents(&self, buffer: Handle) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn bound_vertex_array(&self) -> Option<Handle> {
        self.state.borrow().bound_vertex_array
    }

    /// Attribute `index` of the bound vertex array.
    pub fn attribute(&self, index: u32) -> Option<AttribState> {
        let state = self.state.borrow();
        let vao = state.bound_vertex_array?;
        state.vertex_arrays.get(&vao)?.attribs.get(&index).copied()
    }

    /// Shader objects not yet released (flagged ones still attached count).
    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn current_program(&self) -> Option<Handle> {
        self.state.borrow().current_program
    }

    /// Last value written to uniform `name` of `program`.
    pub fn uniform_value(&self, program: Handle, name: &str) -> Option<[f32; 4]> {
        let state = self.state.borrow();
        let prog = state.programs.get(&program)?;
        let slot = prog.uniforms.iter().position(|u| u == name)? as u32;
        prog.values.get(&slot).copied()
    }

    pub fn clear_count(&self) -> usize {
        self.state.borrow().clears
    }

    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    pub fn viewport_value(&self) -> [i32; 4] {
        self.state.borrow().viewport
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }
}

/// Names declared with `uniform <type> <name>;`, in declaration order.
fn declared_uniforms(source: &str, out: &mut Vec<String>) {
    for line in source.lines() {
        let Some(rest) = line.trim_start().strip_prefix("uniform ") else {
            continue;
        };
        let mut tokens = rest.split_whitespace();
        let (Some(_ty), Some(name)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        let name = name
            .trim_end_matches(';')
            .split('[')
            .next()
            .unwrap_or_default();
        if !name.is_empty() && !out.iter().any(|u| u == name) {
            out.push(name.to_string());
        }
    }
}

impl GlApi for HeadlessGl {
    type Buffer = Handle;
    type VertexArray = Handle;
    type Shader = Handle;
    type Program = Handle;
    type UniformLocation = UniformSlot;

    fn get_error(&self) -> u32 {
        self.state
            .borrow_mut()
            .errors
            .pop_front()
            .unwrap_or(glow::NO_ERROR)
    }

    fn create_buffer(&self) -> Result<Handle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.gen_name()?;
        state.buffers.insert(id, Vec::new());
        Ok(id)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Handle>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = buffer {
            if !state.buffers.contains_key(&id) {
                state.raise(glow::INVALID_OPERATION);
                return;
            }
        }
        match target {
            BufferTarget::Array => state.array_binding = buffer,
            BufferTarget::ElementArray => *state.element_slot() = buffer,
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(id) = state.binding(target) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(storage) = state.buffers.get_mut(&id) {
            *storage = data.to_vec();
        }
    }

    fn delete_buffer(&self, buffer: Handle) {
        let mut state = self.state.borrow_mut();
        state.deleted_buffers.push(buffer);
        if state.buffers.remove(&buffer).is_none() {
            return;
        }
        // Deleting a bound buffer resets the binding to zero.
        if state.array_binding == Some(buffer) {
            state.array_binding = None;
        }
        if state.loose_element_buffer == Some(buffer) {
            state.loose_element_buffer = None;
        }
        for vao in state.vertex_arrays.values_mut() {
            if vao.element_buffer == Some(buffer) {
                vao.element_buffer = None;
            }
        }
    }

    fn buffer_binding(&self, target: BufferTarget) -> Option<Handle> {
        self.state.borrow().binding(target)
    }

    fn create_vertex_array(&self) -> Result<Handle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.gen_name()?;
        state.vertex_arrays.insert(id, VertexArrayState::default());
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: Option<Handle>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = vertex_array {
            if !state.vertex_arrays.contains_key(&id) {
                state.raise(glow::INVALID_OPERATION);
                return;
            }
        }
        state.bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&self, vertex_array: Handle) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(&vertex_array).is_some()
            && state.bound_vertex_array == Some(vertex_array)
        {
            state.bound_vertex_array = None;
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        if index >= MAX_VERTEX_ATTRIBS {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        match state.attrib_mut(index) {
            Some(attrib) => attrib.enabled = true,
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        let mut state = self.state.borrow_mut();
        if index >= MAX_VERTEX_ATTRIBS || !(1..=4).contains(&size) || stride < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let buffer = state.array_binding;
        if buffer.is_none() && offset != 0 {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        match state.attrib_mut(index) {
            Some(attrib) => {
                attrib.size = size;
                attrib.stride = stride;
                attrib.offset = offset;
                attrib.buffer = buffer;
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Handle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.gen_name()?;
        state.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                info_log: String::new(),
                pending_delete: false,
            },
        );
        Ok(id)
    }

    fn shader_source(&self, shader: Handle, source: &str) {
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(s) => s.source = source.to_string(),
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: Handle) {
        let mut state = self.state.borrow_mut();
        let Some(s) = state.shaders.get_mut(&shader) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        let log = if s.source.trim().is_empty() {
            Some("0:1(1): error: syntax error, unexpected end of file")
        } else if !s.source.contains("main") {
            Some("0:1(1): error: function `main' is not defined")
        } else {
            None
        };
        s.compiled = log.is_none();
        s.info_log = log.unwrap_or_default().to_string();
    }

    fn shader_compile_status(&self, shader: Handle) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: Handle) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: Handle) {
        let mut state = self.state.borrow_mut();
        if let Some(s) = state.shaders.get_mut(&shader) {
            s.pending_delete = true;
        }
        state.free_flagged_shaders();
    }

    fn create_program(&self) -> Result<Handle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.gen_name()?;
        state.programs.insert(id, ProgramObject::default());
        Ok(id)
    }

    fn attach_shader(&self, program: Handle, shader: Handle) {
        let mut state = self.state.borrow_mut();
        if !state.shaders.contains_key(&shader) {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let Some(p) = state.programs.get_mut(&program) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        if p.attached.contains(&shader) {
            state.raise(glow::INVALID_OPERATION);
        } else {
            p.attached.push(shader);
        }
    }

    fn link_program(&self, program: Handle) {
        let mut state = self.state.borrow_mut();
        let Some(attached) = state.programs.get(&program).map(|p| p.attached.clone()) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };

        let mut uniforms = Vec::new();
        let mut vertex = 0;
        let mut fragment = 0;
        let mut problems = Vec::new();
        for id in &attached {
            let Some(s) = state.shaders.get(id) else {
                continue;
            };
            if !s.compiled {
                problems.push(format!("{} shader not compiled", s.stage.name()));
                continue;
            }
            match s.stage {
                ShaderStage::Vertex => vertex += 1,
                ShaderStage::Fragment => fragment += 1,
            }
            declared_uniforms(&s.source, &mut uniforms);
        }
        if vertex != 1 {
            problems.push(format!("expected one vertex shader, found {vertex}"));
        }
        if fragment != 1 {
            problems.push(format!("expected one fragment shader, found {fragment}"));
        }

        if let Some(p) = state.programs.get_mut(&program) {
            p.linked = problems.is_empty();
            p.values.clear();
            if p.linked {
                p.uniforms = uniforms;
                p.info_log.clear();
            } else {
                p.uniforms.clear();
                p.info_log = format!("error: linking failed: {}", problems.join("; "));
            }
        }
    }

    fn program_link_status(&self, program: Handle) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn validate_program(&self, program: Handle) {
        let mut state = self.state.borrow_mut();
        let Some(p) = state.programs.get_mut(&program) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        if !p.linked && !p.info_log.contains("validation") {
            p.info_log.push_str("\nvalidation failed: program is not linked");
        }
    }

    fn program_info_log(&self, program: Handle) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<Handle>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = program {
            let error = match state.programs.get(&id) {
                None => Some(glow::INVALID_VALUE),
                Some(p) if !p.linked => Some(glow::INVALID_OPERATION),
                Some(_) => None,
            };
            if let Some(code) = error {
                state.raise(code);
                return;
            }
        }
        state.current_program = program;
    }

    fn delete_program(&self, program: Handle) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program).is_none() {
            return;
        }
        if state.current_program == Some(program) {
            state.current_program = None;
        }
        state.free_flagged_shaders();
    }

    fn uniform_location(&self, program: Handle, name: &str) -> Option<UniformSlot> {
        let mut state = self.state.borrow_mut();
        let lookup = state.programs.get(&program).map(|p| {
            let slot = p.uniforms.iter().position(|u| u == name);
            (p.linked, slot)
        });
        match lookup {
            None => {
                state.raise(glow::INVALID_VALUE);
                None
            }
            Some((false, _)) => {
                state.raise(glow::INVALID_OPERATION);
                None
            }
            Some((true, slot)) => slot.map(|i| UniformSlot(i as u32)),
        }
    }

    fn uniform_4_f32(&self, location: Option<&UniformSlot>, value: [f32; 4]) {
        // A missing location is silently ignored, like location -1.
        let Some(&UniformSlot(slot)) = location else {
            return;
        };
        let mut state = self.state.borrow_mut();
        let Some(current) = state.current_program else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        let written = state
            .programs
            .get_mut(&current)
            .filter(|p| (slot as usize) < p.uniforms.len())
            .map(|p| p.values.insert(slot, value))
            .is_some();
        if !written {
            state.raise(glow::INVALID_OPERATION);
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        state.viewport = [x, y, width, height];
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.state.borrow_mut().clear_color = rgba;
    }

    fn clear_color_buffer(&self) {
        self.state.borrow_mut().clears += 1;
    }

    fn draw_elements(&self, mode: Primitive, count: i32, index_type: IndexType, offset: i32) {
        let mut state = self.state.borrow_mut();
        if count < 0 || offset < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        if state.bound_vertex_array.is_none() {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        let Some(elements) = state.element_binding() else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        let needed = offset as usize + count as usize * index_type.size();
        let available = state.buffers.get(&elements).map_or(0, Vec::len);
        if needed > available {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        // No program in use: nothing is rendered, and core GL raises no error.
        let Some(program) = state.current_program else {
            return;
        };
        state.draws.push(DrawRecord {
            mode,
            count,
            index_type,
            offset,
            program,
        });
    }

    fn version_string(&self) -> String {
        "3.3.0 (headless)".to_string()
    }

    fn max_vertex_attribs(&self) -> i32 {
        MAX_VERTEX_ATTRIBS as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_error_drains_one_flag_at_a_time() {
        let gl = HeadlessGl::new();
        gl.raise_error(glow::INVALID_ENUM);
        gl.raise_error(glow::INVALID_VALUE);
        gl.raise_error(glow::INVALID_ENUM);

        assert_eq!(gl.get_error(), glow::INVALID_ENUM);
        assert_eq!(gl.get_error(), glow::INVALID_VALUE);
        assert_eq!(gl.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn upload_without_binding_raises_invalid_operation() {
        let gl = HeadlessGl::new();
        gl.create_buffer().unwrap();
        gl.buffer_data(BufferTarget::Array, &[1, 2, 3]);
        assert_eq!(gl.get_error(), glow::INVALID_OPERATION);
    }

    #[test]
    fn element_binding_lives_in_the_vertex_array() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array().unwrap();
        let ibo = gl.create_buffer().unwrap();

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(BufferTarget::ElementArray, Some(ibo));
        gl.bind_vertex_array(None);
        assert_eq!(gl.buffer_binding(BufferTarget::ElementArray), None);

        gl.bind_vertex_array(Some(vao));
        assert_eq!(gl.buffer_binding(BufferTarget::ElementArray), Some(ibo));
    }

    #[test]
    fn negative_viewport_is_rejected() {
        let gl = HeadlessGl::new();
        gl.viewport(0, 0, 640, 480);
        gl.viewport(0, 0, -1, 480);

        assert_eq!(gl.get_error(), glow::INVALID_VALUE);
        assert_eq!(gl.viewport_value(), [0, 0, 640, 480]);
    }

    #[test]
    fn uniforms_are_collected_at_link() {
        let mut names = Vec::new();
        declared_uniforms(
            "uniform vec4 u_Color;\n  uniform mat4 u_Mvp ;\nuniform float u_Weights[4];\nvoid main() {}",
            &mut names,
        );
        assert_eq!(names, ["u_Color", "u_Mvp", "u_Weights"]);
    }

    #[test]
    fn draw_without_program_is_silently_skipped() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array().unwrap();
        let ibo = gl.create_buffer().unwrap();
        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(BufferTarget::ElementArray, Some(ibo));
        gl.buffer_data(BufferTarget::ElementArray, &[0; 24]);

        gl.draw_elements(Primitive::Triangles, 6, IndexType::U32, 0);

        assert_eq!(gl.get_error(), glow::NO_ERROR);
        assert!(gl.draws().is_empty());
    }

    #[test]
    fn draw_without_element_buffer_is_an_error() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array().unwrap();
        gl.bind_vertex_array(Some(vao));

        gl.draw_elements(Primitive::Triangles, 6, IndexType::U32, 0);

        assert_eq!(gl.get_error(), glow::INVALID_OPERATION);
    }

    #[test]
    fn flagged_shader_survives_until_program_is_deleted() {
        let gl = HeadlessGl::new();
        let program = gl.create_program().unwrap();
        let vs = gl.create_shader(ShaderStage::Vertex).unwrap();
        gl.attach_shader(program, vs);

        gl.delete_shader(vs);
        assert_eq!(gl.live_shaders(), 1);

        gl.delete_program(program);
        assert_eq!(gl.live_shaders(), 0);
    }
}
