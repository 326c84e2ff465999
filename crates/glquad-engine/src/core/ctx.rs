use crate::device::GlApi;
use crate::time::FrameTime;

/// Per-frame context passed to `core::App::on_frame`.
pub struct FrameCtx<'a, G: GlApi> {
    pub gl: &'a G,
    pub time: FrameTime,
}

impl<'a, G: GlApi> FrameCtx<'a, G> {
    pub fn new(gl: &'a G, time: FrameTime) -> Self {
        Self { gl, time }
    }

    /// Seconds since the frame loop started.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.time.elapsed
    }
}
