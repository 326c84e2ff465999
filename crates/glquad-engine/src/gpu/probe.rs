use std::rc::Rc;

use crate::device::GlApi;

// A lost context can report errors forever; stop draining after this many.
const MAX_DRAIN: usize = 64;

/// A decoded GL error flag.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum GlError {
    #[error("GL_INVALID_ENUM")]
    InvalidEnum,
    #[error("GL_INVALID_VALUE")]
    InvalidValue,
    #[error("GL_INVALID_OPERATION")]
    InvalidOperation,
    #[error("GL_STACK_OVERFLOW")]
    StackOverflow,
    #[error("GL_STACK_UNDERFLOW")]
    StackUnderflow,
    #[error("GL_OUT_OF_MEMORY")]
    OutOfMemory,
    #[error("GL_INVALID_FRAMEBUFFER_OPERATION")]
    InvalidFramebufferOperation,
    #[error("GL_CONTEXT_LOST")]
    ContextLost,
    #[error("unknown GL error 0x{0:04X}")]
    Unknown(u32),
}

impl GlError {
    /// Decodes a `glGetError` result; `None` for `GL_NO_ERROR`.
    pub fn from_code(code: u32) -> Option<Self> {
        let err = match code {
            glow::NO_ERROR => return None,
            glow::INVALID_ENUM => GlError::InvalidEnum,
            glow::INVALID_VALUE => GlError::InvalidValue,
            glow::INVALID_OPERATION => GlError::InvalidOperation,
            glow::STACK_OVERFLOW => GlError::StackOverflow,
            glow::STACK_UNDERFLOW => GlError::StackUnderflow,
            glow::OUT_OF_MEMORY => GlError::OutOfMemory,
            glow::INVALID_FRAMEBUFFER_OPERATION => GlError::InvalidFramebufferOperation,
            glow::CONTEXT_LOST => GlError::ContextLost,
            other => GlError::Unknown(other),
        };
        Some(err)
    }

    pub fn code(self) -> u32 {
        match self {
            GlError::InvalidEnum => glow::INVALID_ENUM,
            GlError::InvalidValue => glow::INVALID_VALUE,
            GlError::InvalidOperation => glow::INVALID_OPERATION,
            GlError::StackOverflow => glow::STACK_OVERFLOW,
            GlError::StackUnderflow => glow::STACK_UNDERFLOW,
            GlError::OutOfMemory => glow::OUT_OF_MEMORY,
            GlError::InvalidFramebufferOperation => glow::INVALID_FRAMEBUFFER_OPERATION,
            GlError::ContextLost => glow::CONTEXT_LOST,
            GlError::Unknown(code) => code,
        }
    }
}

/// How [`ErrorProbe::guard`] reacts to an error raised by the wrapped call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProbeMode {
    /// Panic, halting the frame loop (and breaking into an attached debugger).
    Trap,
    /// Log at error level and continue.
    Log,
    /// Run the call without touching the error flags.
    Disabled,
}

impl Default for ProbeMode {
    /// `Trap` in debug builds, `Log` otherwise.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ProbeMode::Trap
        } else {
            ProbeMode::Log
        }
    }
}

/// Clear/check instrumentation around individual GL calls.
///
/// Usage is always the same: drain stale flags, issue one call, look at the
/// flags again. [`guard`](Self::guard) does all three.
pub struct ErrorProbe<G: GlApi> {
    gl: Rc<G>,
    mode: ProbeMode,
}

impl<G: GlApi> ErrorProbe<G> {
    pub fn new(gl: &Rc<G>, mode: ProbeMode) -> Self {
        Self {
            gl: Rc::clone(gl),
            mode,
        }
    }

    #[inline]
    pub fn mode(&self) -> ProbeMode {
        self.mode
    }

    /// Drains every pending error flag.
    pub fn clear(&self) {
        for _ in 0..MAX_DRAIN {
            if self.gl.get_error() == glow::NO_ERROR {
                return;
            }
        }
        log::warn!("error flags still set after {MAX_DRAIN} reads; context may be lost");
    }

    /// Returns the first pending error, draining (and logging) any others.
    pub fn check(&self) -> Option<GlError> {
        let first = GlError::from_code(self.gl.get_error())?;

        for _ in 0..MAX_DRAIN {
            match GlError::from_code(self.gl.get_error()) {
                Some(extra) => log::warn!("additional pending GL error: {extra}"),
                None => break,
            }
        }

        Some(first)
    }

    /// Runs `call` between [`clear`](Self::clear) and [`check`](Self::check).
    ///
    /// `label` names the call in the trap/log message.
    pub fn guard<R>(&self, label: &str, call: impl FnOnce(&G) -> R) -> R {
        if self.mode == ProbeMode::Disabled {
            return call(&*self.gl);
        }

        self.clear();
        let out = call(&*self.gl);

        if let Some(err) = self.check() {
            match self.mode {
                ProbeMode::Trap => panic!("{err} raised by `{label}`"),
                ProbeMode::Log => log::error!("{err} raised by `{label}`"),
                ProbeMode::Disabled => {}
            }
        }

        out
    }
}

/// Runs one GL call under an [`ErrorProbe`], labelling it with its own source text.
///
/// ```ignore
/// gl_probe!(probe, |gl| gl.draw_elements(Primitive::Triangles, 6, IndexType::U32, 0));
/// ```
#[macro_export]
macro_rules! gl_probe {
    ($probe:expr, |$gl:ident| $call:expr) => {
        $probe.guard(stringify!($call), |$gl| $call)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BufferTarget, HeadlessGl};

    fn probe(mode: ProbeMode) -> (Rc<HeadlessGl>, ErrorProbe<HeadlessGl>) {
        let gl = Rc::new(HeadlessGl::new());
        let probe = ErrorProbe::new(&gl, mode);
        (gl, probe)
    }

    #[test]
    fn decodes_known_codes() {
        assert_eq!(GlError::from_code(glow::NO_ERROR), None);
        assert_eq!(
            GlError::from_code(glow::INVALID_OPERATION),
            Some(GlError::InvalidOperation)
        );
        assert_eq!(GlError::from_code(0x9999), Some(GlError::Unknown(0x9999)));
        assert_eq!(GlError::OutOfMemory.code(), glow::OUT_OF_MEMORY);
        assert_eq!(GlError::Unknown(0x9999).to_string(), "unknown GL error 0x9999");
    }

    #[test]
    fn clear_drains_stale_flags() {
        let (gl, probe) = probe(ProbeMode::Log);
        gl.raise_error(glow::INVALID_ENUM);
        gl.raise_error(glow::INVALID_VALUE);

        probe.clear();

        assert!(!gl.has_pending_error());
        assert_eq!(probe.check(), None);
    }

    #[test]
    fn check_returns_first_and_drains_rest() {
        let (gl, probe) = probe(ProbeMode::Log);
        gl.raise_error(glow::INVALID_VALUE);
        gl.raise_error(glow::OUT_OF_MEMORY);

        assert_eq!(probe.check(), Some(GlError::InvalidValue));
        assert!(!gl.has_pending_error());
    }

    #[test]
    fn guard_ignores_errors_raised_before_the_call() {
        let (gl, probe) = probe(ProbeMode::Trap);
        gl.raise_error(glow::INVALID_ENUM);

        let value = probe.guard("noop", |_| 7);

        assert_eq!(value, 7);
        assert!(!gl.has_pending_error());
    }

    #[test]
    #[should_panic(expected = "GL_INVALID_OPERATION")]
    fn trap_mode_panics_on_failed_call() {
        let (_gl, probe) = probe(ProbeMode::Trap);
        probe.guard("buffer_data", |gl| gl.buffer_data(BufferTarget::Array, &[0; 4]));
    }

    #[test]
    fn log_mode_continues_and_leaves_flags_clear() {
        let (gl, probe) = probe(ProbeMode::Log);
        probe.guard("buffer_data", |gl| gl.buffer_data(BufferTarget::Array, &[0; 4]));
        assert!(!gl.has_pending_error());
    }

    #[test]
    fn disabled_mode_leaves_flags_untouched() {
        let (gl, probe) = probe(ProbeMode::Disabled);
        crate::gl_probe!(probe, |gl| gl.buffer_data(BufferTarget::Array, &[0; 4]));
        assert!(gl.has_pending_error());
    }
}
