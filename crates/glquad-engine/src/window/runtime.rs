use std::mem;
use std::rc::Rc;

use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::core::{App, AppControl, FrameCtx, LoopState};
use crate::device::{ContextConfig, GlApi, GlContext, GlowDevice};
use crate::time::FrameClock;

/// Entry point for the frame loop.
pub struct Runtime;

impl Runtime {
    /// Opens the window, builds the app with `build`, and drives frames until
    /// the window is closed.
    ///
    /// Setup failures (event loop, window, context, `build`) are returned.
    pub fn run<A, F>(config: ContextConfig, build: F) -> Result<()>
    where
        A: App<GlowDevice> + 'static,
        F: FnOnce(&Rc<GlowDevice>) -> Result<A> + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            config,
            lifecycle: Lifecycle::new(build),
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.lifecycle.finish()
    }
}

/// Live objects of the `Running` state.
///
/// Field order is drop order: the app (and its GPU objects) before the context.
struct Running<A, C> {
    app: A,
    clock: FrameClock,
    context: C,
}

enum Phase<A, F, C> {
    Uninitialized(F),
    Running(Running<A, C>),
    Terminated,
}

impl<A, F, C> Phase<A, F, C> {
    fn state(&self) -> LoopState {
        match self {
            Phase::Uninitialized(_) => LoopState::Uninitialized,
            Phase::Running(_) => LoopState::Running,
            Phase::Terminated => LoopState::Terminated,
        }
    }
}

/// Lifecycle transitions, independent of the event loop.
///
/// `F` is the pending app builder and `C` the context the app draws into.
struct Lifecycle<A, F, C> {
    phase: Phase<A, F, C>,
    failure: Option<anyhow::Error>,
}

impl<A, F, C> Lifecycle<A, F, C> {
    fn new(build: F) -> Self {
        Self {
            phase: Phase::Uninitialized(build),
            failure: None,
        }
    }

    fn state(&self) -> LoopState {
        self.phase.state()
    }

    /// `Uninitialized -> Running` through `start`, on the first call only.
    ///
    /// Returns `true` when the loop is now running. A `start` error is kept for
    /// [`finish`](Self::finish) and terminates the loop.
    fn resume(&mut self, start: impl FnOnce(F) -> Result<Running<A, C>>) -> bool {
        if self.state() != LoopState::Uninitialized {
            return false;
        }

        let Phase::Uninitialized(build) = mem::replace(&mut self.phase, Phase::Terminated) else {
            return false;
        };

        match start(build) {
            Ok(running) => {
                self.phase = Phase::Running(running);
                log::debug!("frame loop running");
                true
            }
            Err(err) => {
                self.terminate(Some(err));
                false
            }
        }
    }

    /// Moves to `Terminated`, dropping the app before the context.
    ///
    /// Only the first failure is kept.
    fn terminate(&mut self, failure: Option<anyhow::Error>) {
        if let Some(err) = failure {
            log::debug!("terminating after error: {err:#}");
            if self.failure.is_none() {
                self.failure = Some(err);
            }
        }

        if self.state() != LoopState::Terminated {
            log::info!("shutting down");
        }
        self.phase = Phase::Terminated;
    }

    fn running(&self) -> Option<&Running<A, C>> {
        match &self.phase {
            Phase::Running(running) => Some(running),
            _ => None,
        }
    }

    fn running_mut(&mut self) -> Option<&mut Running<A, C>> {
        match &mut self.phase {
            Phase::Running(running) => Some(running),
            _ => None,
        }
    }

    /// The stored failure, if any.
    fn finish(mut self) -> Result<()> {
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Creates the window and context, then builds the app against them.
fn start<A, F>(
    event_loop: &ActiveEventLoop,
    config: &ContextConfig,
    build: F,
) -> Result<Running<A, GlContext>>
where
    F: FnOnce(&Rc<GlowDevice>) -> Result<A>,
{
    let context = GlContext::new(event_loop, config)?;

    let gl = context.gl();
    log::info!("OpenGL {}", gl.version_string());
    log::info!("max vertex attributes: {}", gl.max_vertex_attribs());

    let app = build(gl).context("failed to build application")?;

    Ok(Running {
        app,
        clock: FrameClock::new(),
        context,
    })
}

struct AppState<A, F> {
    config: ContextConfig,
    lifecycle: Lifecycle<A, F, GlContext>,
}

impl<A, F> AppState<A, F>
where
    A: App<GlowDevice>,
{
    fn terminate(&mut self, event_loop: &ActiveEventLoop, failure: Option<anyhow::Error>) {
        self.lifecycle.terminate(failure);
        event_loop.exit();
    }

    fn draw_frame(&mut self) -> Result<AppControl> {
        let Some(running) = self.lifecycle.running_mut() else {
            return Ok(AppControl::Continue);
        };

        let time = running.clock.tick();

        let control = {
            let gl: &GlowDevice = running.context.gl();
            let mut ctx = FrameCtx::new(gl, time);
            running.app.on_frame(&mut ctx)
        };

        if control == AppControl::Continue {
            running.context.present()?;
        }

        Ok(control)
    }
}

impl<A, F> ApplicationHandler for AppState<A, F>
where
    A: App<GlowDevice>,
    F: FnOnce(&Rc<GlowDevice>) -> Result<A>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Non-blocking poll: frames are driven back to back.
        event_loop.set_control_flow(ControlFlow::Poll);

        let config = &self.config;
        let started = self
            .lifecycle
            .resume(|build| start(event_loop, config, build));

        if let Some(running) = self.lifecycle.running().filter(|_| started) {
            running.context.window().request_redraw();
        }

        if self.lifecycle.state() == LoopState::Terminated {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = self.lifecycle.running() {
            running.context.window().request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.terminate(event_loop, None),

            WindowEvent::Resized(new_size) => {
                if let Some(running) = self.lifecycle.running() {
                    running.context.resize(new_size);
                }
            }

            WindowEvent::RedrawRequested => match self.draw_frame() {
                Ok(AppControl::Continue) => {}
                Ok(AppControl::Exit) => self.terminate(event_loop, None),
                Err(err) => self.terminate(event_loop, Some(err)),
            },

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Covers exits not initiated by us (e.g. platform shutdown).
        self.lifecycle.terminate(None);
    }
}
