//! Shader source loading.
//!
//! Sources are plain text read from disk with no templating or includes.
//! A missing file is not an error here: it produces an empty source, which the
//! shader compiler then rejects.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const VERTEX_SHADER_FILE: &str = "vertex.shader";
pub const FRAGMENT_SHADER_FILE: &str = "fragment.shader";

/// Reads a shader file line by line, terminating every line with `\n`.
///
/// Returns an empty string (and logs a warning) when the file cannot be read.
pub fn load_shader_source(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("cannot open shader {}: {e}", path.display());
            return String::new();
        }
    };

    let mut source = String::new();
    for line in BufReader::new(file).lines() {
        match line {
            Ok(line) => {
                source.push_str(&line);
                source.push('\n');
            }
            Err(e) => {
                log::warn!("stopped reading shader {}: {e}", path.display());
                break;
            }
        }
    }

    log::debug!("loaded shader {} ({} bytes)", path.display(), source.len());
    source
}

/// A vertex + fragment source pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    /// Loads `vertex.shader` and `fragment.shader` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            vertex: load_shader_source(dir.join(VERTEX_SHADER_FILE)),
            fragment: load_shader_source(dir.join(FRAGMENT_SHADER_FILE)),
        }
    }
}
