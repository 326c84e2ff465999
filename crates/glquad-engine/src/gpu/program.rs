use std::rc::Rc;

use crate::assets::ShaderSources;
use crate::device::{GlApi, ShaderStage};

/// What [`ShaderProgram::new`] does when a stage fails to compile or the
/// program fails to link.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ShaderPolicy {
    /// Log the driver diagnostics and hand back the (unusable) program.
    #[default]
    Permissive,
    /// Log, release the program, and return a [`ShaderError`].
    FailFast,
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to create {object} object: {reason}")]
    Create { object: &'static str, reason: String },

    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("shader program failed to link: {log}")]
    Link { log: String },
}

/// Outcome of compiling one stage.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CompileStatus {
    Compiled,
    /// Carries the compiler info log.
    Failed(String),
}

impl CompileStatus {
    #[inline]
    pub fn is_compiled(&self) -> bool {
        matches!(self, CompileStatus::Compiled)
    }
}

/// A compiled (or failed) shader object, deleted when dropped.
pub struct CompiledShader<'a, G: GlApi> {
    gl: &'a G,
    handle: G::Shader,
    stage: ShaderStage,
    status: CompileStatus,
}

impl<G: GlApi> CompiledShader<'_, G> {
    #[inline]
    pub fn handle(&self) -> G::Shader {
        self.handle
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn status(&self) -> &CompileStatus {
        &self.status
    }
}

impl<G: GlApi> Drop for CompiledShader<'_, G> {
    fn drop(&mut self) {
        self.gl.delete_shader(self.handle);
    }
}

/// Compiles `source` as a `stage` shader and reports the compile status.
///
/// A failed compile is not an `Err`: the shader object still exists and the
/// info log is carried in [`CompileStatus::Failed`].
pub fn compile_shader<'a, G: GlApi>(
    gl: &'a G,
    stage: ShaderStage,
    source: &str,
) -> Result<CompiledShader<'a, G>, ShaderError> {
    let handle = gl.create_shader(stage).map_err(|reason| ShaderError::Create {
        object: stage.name(),
        reason,
    })?;

    gl.shader_source(handle, source);
    gl.compile_shader(handle);

    let status = if gl.shader_compile_status(handle) {
        CompileStatus::Compiled
    } else {
        CompileStatus::Failed(gl.shader_info_log(handle))
    };

    Ok(CompiledShader {
        gl,
        handle,
        stage,
        status,
    })
}

/// A linked vertex + fragment program.
///
/// The intermediate shader objects live only inside [`new`](Self::new).
/// The program handle is deleted on drop.
pub struct ShaderProgram<G: GlApi> {
    gl: Rc<G>,
    handle: G::Program,
    linked: bool,
    diagnostics: Vec<String>,
}

impl<G: GlApi> ShaderProgram<G> {
    /// Compiles both stages, links and validates the program.
    ///
    /// Under [`ShaderPolicy::Permissive`] failures are logged and the program is
    /// returned anyway; check [`is_linked`](Self::is_linked) before relying on it.
    pub fn new(
        gl: &Rc<G>,
        sources: &ShaderSources,
        policy: ShaderPolicy,
    ) -> Result<Self, ShaderError> {
        let handle = gl.create_program().map_err(|reason| ShaderError::Create {
            object: "program",
            reason,
        })?;

        // From here on, early returns release the program through Drop.
        let mut program = Self {
            gl: Rc::clone(gl),
            handle,
            linked: false,
            diagnostics: Vec::new(),
        };

        let vertex = compile_shader(gl.as_ref(), ShaderStage::Vertex, &sources.vertex)?;
        let fragment = compile_shader(gl.as_ref(), ShaderStage::Fragment, &sources.fragment)?;

        for shader in [&vertex, &fragment] {
            if let CompileStatus::Failed(log) = shader.status() {
                log::error!("{} shader compilation failed: {}", shader.stage(), log.trim_end());
                program
                    .diagnostics
                    .push(format!("{}: {}", shader.stage(), log.trim_end()));

                if policy == ShaderPolicy::FailFast {
                    return Err(ShaderError::Compile {
                        stage: shader.stage(),
                        log: log.clone(),
                    });
                }
            }
        }

        gl.attach_shader(handle, vertex.handle());
        gl.attach_shader(handle, fragment.handle());
        gl.link_program(handle);
        gl.validate_program(handle);

        program.linked = gl.program_link_status(handle);
        let info = gl.program_info_log(handle);

        if !program.linked {
            log::error!("shader program link failed: {}", info.trim_end());
            program.diagnostics.push(format!("link: {}", info.trim_end()));

            if policy == ShaderPolicy::FailFast {
                return Err(ShaderError::Link { log: info });
            }
        } else if !info.trim().is_empty() {
            log::debug!("shader program info log: {}", info.trim_end());
        }

        drop((vertex, fragment));

        log::debug!("shader program {handle:?} ready (linked: {})", program.linked);
        Ok(program)
    }

    /// Installs this program for subsequent draw calls.
    #[inline]
    pub fn activate(&self) {
        self.gl.use_program(Some(self.handle));
    }

    /// Looks up a uniform by name; `None` if the program has no such active uniform.
    pub fn uniform_location(&self, name: &str) -> Option<G::UniformLocation> {
        self.gl.uniform_location(self.handle, name)
    }

    /// Looks up `name` and writes a `vec4` to it.
    ///
    /// The program must be active. An unknown name is a silent no-op, as with
    /// location `-1` in GL.
    pub fn set_uniform_4f(&self, name: &str, value: [f32; 4]) {
        let location = self.uniform_location(name);
        if location.is_none() {
            log::trace!("uniform `{name}` not found in program {:?}", self.handle);
        }
        self.gl.uniform_4_f32(location.as_ref(), value);
    }

    #[inline]
    pub fn handle(&self) -> G::Program {
        self.handle
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Compiler and linker messages collected during construction.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

impl<G: GlApi> Drop for ShaderProgram<G> {
    fn drop(&mut self) {
        self.gl.delete_program(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGl;

    const VERTEX: &str = "#version 330 core\n\
        layout(location = 0) in vec4 position;\n\
        void main() { gl_Position = position; }\n";

    const FRAGMENT: &str = "#version 330 core\n\
        layout(location = 0) out vec4 color;\n\
        uniform vec4 u_Color;\n\
        void main() { color = u_Color; }\n";

    fn sources(vertex: &str, fragment: &str) -> ShaderSources {
        ShaderSources {
            vertex: vertex.to_string(),
            fragment: fragment.to_string(),
        }
    }

    #[test]
    fn valid_pair_links_and_exposes_u_color() {
        let gl = Rc::new(HeadlessGl::new());
        let program = ShaderProgram::new(&gl, &sources(VERTEX, FRAGMENT), ShaderPolicy::FailFast)
            .unwrap();

        assert!(program.is_linked());
        assert!(program.diagnostics().is_empty());
        assert!(program.uniform_location("u_Color").is_some());
        assert!(program.uniform_location("u_Missing").is_none());
    }

    #[test]
    fn shader_objects_do_not_outlive_the_program() {
        let gl = Rc::new(HeadlessGl::new());
        let program = ShaderProgram::new(&gl, &sources(VERTEX, FRAGMENT), ShaderPolicy::FailFast)
            .unwrap();
        assert_eq!(gl.live_programs(), 1);

        drop(program);

        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn empty_source_fails_to_compile() {
        let gl = HeadlessGl::new();
        let shader = compile_shader(&gl, ShaderStage::Vertex, "").unwrap();

        assert!(!shader.status().is_compiled());
        assert_ne!(shader.status(), &CompileStatus::Compiled);
    }

    #[test]
    fn permissive_policy_returns_unlinked_program() {
        let gl = Rc::new(HeadlessGl::new());
        let program =
            ShaderProgram::new(&gl, &sources(VERTEX, ""), ShaderPolicy::Permissive).unwrap();

        assert!(!program.is_linked());
        assert_eq!(program.diagnostics().len(), 2);
        assert!(program.diagnostics()[0].starts_with("fragment:"));
    }

    #[test]
    fn fail_fast_reports_stage_and_releases_program() {
        let gl = Rc::new(HeadlessGl::new());
        let err = ShaderProgram::new(&gl, &sources("", FRAGMENT), ShaderPolicy::FailFast)
            .err()
            .unwrap();

        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn set_uniform_writes_through_active_program() {
        let gl = Rc::new(HeadlessGl::new());
        let program = ShaderProgram::new(&gl, &sources(VERTEX, FRAGMENT), ShaderPolicy::FailFast)
            .unwrap();

        program.activate();
        program.set_uniform_4f("u_Color", [0.5, 0.0, 0.2, 1.0]);
        program.set_uniform_4f("u_Missing", [1.0; 4]);

        assert_eq!(
            gl.uniform_value(program.handle(), "u_Color"),
            Some([0.5, 0.0, 0.2, 1.0])
        );
        assert!(!gl.has_pending_error());
    }
}
