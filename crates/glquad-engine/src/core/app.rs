use crate::device::GlApi;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Frame loop lifecycle.
///
/// `Uninitialized -> Running` happens once, when the window and context exist
/// and the app has been built. `Running -> Terminated` happens on a close
/// request or `AppControl::Exit`, and is final.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Terminated,
}

/// Application contract driven by the runtime.
///
/// The app is built after the GL context exists and owns its GPU objects;
/// dropping it releases them, which the runtime does before tearing down the
/// context.
pub trait App<G: GlApi> {
    /// Called once per frame, before the runtime presents.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, G>) -> AppControl;
}
