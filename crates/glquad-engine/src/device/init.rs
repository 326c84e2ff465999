use winit::dpi::LogicalSize;

/// Window + GL context creation parameters.
///
/// Defaults match the demo: a 640x480 "Hello World" window backed by an
/// OpenGL 3.3 core context.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub title: String,

    /// Initial inner size in logical pixels.
    pub size: LogicalSize<f64>,

    /// Requested OpenGL version as `(major, minor)`.
    pub gl_version: (u8, u8),

    /// Request a core profile (no fixed-function or compatibility entry points).
    pub core_profile: bool,

    /// Wait for vertical blank when presenting.
    ///
    /// Failing to apply the swap interval is logged and otherwise ignored.
    pub vsync: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            title: "Hello World".to_string(),
            size: LogicalSize::new(640.0, 480.0),
            gl_version: (3, 3),
            core_profile: true,
            vsync: true,
        }
    }
}
