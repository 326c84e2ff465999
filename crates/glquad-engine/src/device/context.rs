use std::num::NonZeroU32;
use std::rc::Rc;

use anyhow::{Context, Result};
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use super::{ContextConfig, GlApi, GlowDevice};

/// Owns the window, the current GL context and its surface.
///
/// Field order is drop order: the device goes first, the window last.
pub struct GlContext {
    /// Shared with every GPU object created for this context.
    gl: Rc<GlowDevice>,

    surface: Surface<WindowSurface>,

    context: PossiblyCurrentContext,

    window: Window,
}

impl GlContext {
    /// Creates the window and a GL context made current on this thread.
    ///
    /// # Panics
    /// If the display reports success but offers no GL configs at all.
    /// `glutin-winit`'s config picker must return a config, so that case cannot
    /// be turned into an error here.
    pub fn new(event_loop: &ActiveEventLoop, config: &ContextConfig) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.size);

        let template = ConfigTemplateBuilder::new();

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attrs))
            .build(event_loop, template, |configs| {
                configs
                    .max_by_key(|c| c.num_samples())
                    .expect("display offered no GL configs")
            })
            .map_err(|e| anyhow::anyhow!("failed to create window and GL config: {e}"))?;

        let window = window.context("display builder returned no window")?;

        let raw_handle = window
            .window_handle()
            .context("window has no native handle")?
            .as_raw();

        let (major, minor) = config.gl_version;
        let profile = if config.core_profile {
            GlProfile::Core
        } else {
            GlProfile::Compatibility
        };
        let context_attrs = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .with_profile(profile)
            .build(Some(raw_handle));

        let display = gl_config.display();

        // SAFETY: the window handle stays valid for the lifetime of `Self`.
        let not_current = unsafe { display.create_context(&gl_config, &context_attrs) }
            .with_context(|| format!("failed to create OpenGL {major}.{minor} context"))?;

        let surface_attrs = window
            .build_surface_attributes(Default::default())
            .context("failed to describe window surface")?;

        // SAFETY: as above.
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attrs) }
            .context("failed to create window surface")?;

        let context = not_current
            .make_current(&surface)
            .context("failed to make GL context current")?;

        let interval = if config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&context, interval) {
            log::warn!("failed to set swap interval: {e}");
        }

        // SAFETY: the context was made current just above and is owned by `Self`,
        // which drops the device before the context.
        let gl = unsafe { GlowDevice::from_loader(|symbol| display.get_proc_address(symbol)) };

        let size = window.inner_size();
        gl.viewport(0, 0, size.width as i32, size.height as i32);

        Ok(Self {
            gl: Rc::new(gl),
            surface,
            context,
            window,
        })
    }

    pub fn gl(&self) -> &Rc<GlowDevice> {
        &self.gl
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Resizes the surface and the GL viewport. Zero sizes (minimized) are skipped.
    pub fn resize(&self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.window.resize_surface(&self.surface, &self.context);
        self.gl
            .viewport(0, 0, new_size.width as i32, new_size.height as i32);
    }

    /// Swaps front and back buffers.
    pub fn present(&self) -> Result<()> {
        self.window.pre_present_notify();
        self.surface
            .swap_buffers(&self.context)
            .context("failed to swap buffers")
    }
}
