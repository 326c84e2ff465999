//! The quad: one vertex array, one vertex buffer, one index buffer, one program.

use std::f64::consts::PI;
use std::rc::Rc;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};

use glquad_engine::assets::ShaderSources;
use glquad_engine::color::Color;
use glquad_engine::core::{App, AppControl, FrameCtx};
use glquad_engine::device::{GlApi, Primitive};
use glquad_engine::gl_probe;
use glquad_engine::gpu::{
    ErrorProbe, IndexBuffer, ProbeMode, ShaderPolicy, ShaderProgram, VertexArray,
    VertexAttribute, VertexBuffer,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Position {
    pub pos: [f32; 2], // NDC
}

pub const QUAD_VERTICES: [Position; 4] = [
    Position { pos: [-0.5, -0.5] },
    Position { pos: [0.5, -0.5] },
    Position { pos: [0.5, 0.5] },
    Position { pos: [-0.5, 0.5] },
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

pub const COLOR_UNIFORM: &str = "u_Color";

/// Period of [`pulse`], in seconds.
pub const PULSE_PERIOD: f64 = 4.0 * PI;

/// Blue channel of the quad at `elapsed` seconds: `sin(t / 2) + 0.2`.
///
/// Ranges over [-0.8, 1.2]; the driver clamps the written color.
pub fn pulse(elapsed: f64) -> f32 {
    ((elapsed / 2.0).sin() + 0.2) as f32
}

pub fn quad_color(elapsed: f64) -> Color {
    Color::new(0.5, 0.0, pulse(elapsed), 1.0)
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SceneOptions {
    pub shader_policy: ShaderPolicy,
    pub probe_mode: ProbeMode,
}

/// Owns the quad's GPU objects.
pub struct QuadScene<G: GlApi> {
    // Drop order: program first, vertex array last.
    program: ShaderProgram<G>,
    index_buffer: IndexBuffer<G>,
    vertex_buffer: VertexBuffer<G>,
    vertex_array: VertexArray<G>,
    probe: ErrorProbe<G>,
}

impl<G: GlApi> QuadScene<G> {
    /// Builds buffers, attribute layout and program, and leaves the program active.
    pub fn new(gl: &Rc<G>, sources: &ShaderSources, options: SceneOptions) -> Result<Self> {
        let probe = ErrorProbe::new(gl, options.probe_mode);

        gl.clear_color(Color::BLACK.to_array());

        // The vertex array records the attribute setup and element binding below.
        let vertex_array = VertexArray::new(gl)?;
        vertex_array.bind();

        let vertex_buffer = VertexBuffer::new(gl, &QUAD_VERTICES)?;
        let index_buffer = IndexBuffer::new(gl, &QUAD_INDICES)?;

        vertex_buffer.bind();
        probe.guard("enable position attribute", |_| {
            vertex_array.enable_attribute(VertexAttribute::packed_f32(0, 2))
        });
        index_buffer.bind();

        let program = ShaderProgram::new(gl, sources, options.shader_policy)?;
        program.activate();

        log::info!(
            "quad ready: {} vertices, {} indices",
            vertex_buffer.len(),
            index_buffer.count()
        );

        Ok(Self {
            program,
            index_buffer,
            vertex_buffer,
            vertex_array,
            probe,
        })
    }

    /// Clears, updates `u_Color` for `elapsed` and issues the indexed draw.
    pub fn draw(&self, gl: &G, elapsed: f64) {
        gl.clear_color_buffer();

        self.program
            .set_uniform_4f(COLOR_UNIFORM, quad_color(elapsed).to_array());

        self.vertex_array.bind();
        let Ok(count) = i32::try_from(self.index_buffer.count()) else {
            log::error!("index count {} exceeds a GL draw count", self.index_buffer.count());
            return;
        };
        let index_type = self.index_buffer.index_type();
        gl_probe!(self.probe, |gl| gl.draw_elements(
            Primitive::Triangles,
            count,
            index_type,
            0
        ));
    }

    pub fn program(&self) -> &ShaderProgram<G> {
        &self.program
    }

    pub fn index_buffer(&self) -> &IndexBuffer<G> {
        &self.index_buffer
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer<G> {
        &self.vertex_buffer
    }
}

impl<G: GlApi> App<G> for QuadScene<G> {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, G>) -> AppControl {
        self.draw(ctx.gl, ctx.elapsed());
        AppControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use glquad_engine::device::{HeadlessGl, IndexType};
    use glquad_engine::gpu::GlError;
    use glquad_engine::time::FrameTime;

    use super::*;

    fn shipped_sources() -> ShaderSources {
        ShaderSources {
            vertex: include_str!("../res/shaders/vertex.shader").to_string(),
            fragment: include_str!("../res/shaders/fragment.shader").to_string(),
        }
    }

    fn options(probe_mode: ProbeMode) -> SceneOptions {
        SceneOptions {
            shader_policy: ShaderPolicy::FailFast,
            probe_mode,
        }
    }

    fn frame_at(elapsed: f64) -> FrameTime {
        FrameTime {
            dt: 1.0 / 60.0,
            elapsed,
            now: Instant::now(),
            frame_index: 0,
        }
    }

    #[test]
    fn pulse_is_periodic() {
        for t in [0.0, 0.7, 3.0] {
            assert!((pulse(t) - pulse(t + PULSE_PERIOD)).abs() < 1e-5);
        }
        assert!((pulse(0.0) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn quad_has_six_indices() {
        let gl = Rc::new(HeadlessGl::new());
        let scene = QuadScene::new(&gl, &shipped_sources(), options(ProbeMode::Trap)).unwrap();

        assert_eq!(scene.index_buffer().count(), 6);
        assert_eq!(scene.vertex_buffer().byte_len(), 32);
        assert_eq!(gl.clear_color_value(), Color::BLACK.to_array());
    }

    #[test]
    fn one_frame_draws_without_gl_errors() {
        let gl = Rc::new(HeadlessGl::new());
        let mut scene =
            QuadScene::new(&gl, &shipped_sources(), options(ProbeMode::Trap)).unwrap();
        assert!(!gl.has_pending_error());

        let mut ctx = FrameCtx::new(&*gl, frame_at(0.0));
        assert_eq!(scene.on_frame(&mut ctx), AppControl::Continue);

        assert!(!gl.has_pending_error());
        assert_eq!(gl.clear_count(), 1);

        let draws = gl.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, Primitive::Triangles);
        assert_eq!(draws[0].count, 6);
        assert_eq!(draws[0].index_type, IndexType::U32);
        assert_eq!(draws[0].program, scene.program().handle());

        let color = gl
            .uniform_value(scene.program().handle(), COLOR_UNIFORM)
            .unwrap();
        assert_eq!(color, quad_color(0.0).to_array());
    }

    #[test]
    fn draw_without_element_buffer_raises_error() {
        let gl = Rc::new(HeadlessGl::new());
        let scene =
            QuadScene::new(&gl, &shipped_sources(), options(ProbeMode::Disabled)).unwrap();

        // Unbinding while the vertex array is bound clears its element binding.
        scene.index_buffer().unbind();
        scene.draw(&gl, 1.0);

        assert_eq!(
            GlError::from_code(gl.get_error()),
            Some(GlError::InvalidOperation)
        );
        assert!(gl.draws().is_empty());
    }

    #[test]
    #[should_panic(expected = "GL_INVALID_OPERATION")]
    fn trap_probe_halts_on_failed_draw() {
        let gl = Rc::new(HeadlessGl::new());
        let scene = QuadScene::new(&gl, &shipped_sources(), options(ProbeMode::Trap)).unwrap();

        scene.index_buffer().unbind();
        scene.draw(&gl, 1.0);
    }

    #[test]
    fn missing_shaders_fail_fast() {
        let gl = Rc::new(HeadlessGl::new());
        let result = QuadScene::new(&gl, &ShaderSources::default(), options(ProbeMode::Trap));

        assert!(result.is_err());
        assert_eq!(gl.live_buffers(), 0);
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_vertex_arrays(), 0);
    }

    #[test]
    fn permissive_policy_keeps_drawing_with_broken_shaders() {
        let gl = Rc::new(HeadlessGl::new());
        let options = SceneOptions {
            shader_policy: ShaderPolicy::Permissive,
            probe_mode: ProbeMode::Trap,
        };
        let mut scene = QuadScene::new(&gl, &ShaderSources::default(), options).unwrap();
        assert!(!scene.program().is_linked());

        let mut ctx = FrameCtx::new(&*gl, frame_at(0.0));
        assert_eq!(scene.on_frame(&mut ctx), AppControl::Continue);

        assert!(!gl.has_pending_error());
        assert!(gl.draws().is_empty());
        assert_eq!(gl.clear_count(), 1);
    }

    #[test]
    fn dropping_scene_releases_everything() {
        let gl = Rc::new(HeadlessGl::new());
        let scene = QuadScene::new(&gl, &shipped_sources(), options(ProbeMode::Trap)).unwrap();
        drop(scene);

        assert_eq!(gl.live_buffers(), 0);
        assert_eq!(gl.deleted_buffers().len(), 2);
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_vertex_arrays(), 0);
    }
}
