use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use glquad_demo::scene::{QuadScene, SceneOptions};
use glquad_engine::assets::ShaderSources;
use glquad_engine::device::ContextConfig;
use glquad_engine::gpu::{ProbeMode, ShaderPolicy};
use glquad_engine::logging::{init_logging, LoggingConfig};
use glquad_engine::window::Runtime;

/// Overrides the directory holding `vertex.shader` and `fragment.shader`.
const SHADER_DIR_ENV: &str = "GLQUAD_SHADER_DIR";
const DEFAULT_SHADER_DIR: &str = "res/shaders";

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            // -1 as seen by the parent process.
            ExitCode::from(255)
        }
    }
}

fn run() -> Result<()> {
    let shader_dir = shader_dir();
    log::info!("loading shaders from {}", shader_dir.display());
    let sources = ShaderSources::load(&shader_dir);

    let options = SceneOptions {
        shader_policy: ShaderPolicy::FailFast,
        probe_mode: ProbeMode::default(),
    };

    Runtime::run(ContextConfig::default(), move |gl| {
        QuadScene::new(gl, &sources, options)
    })
}

/// `$GLQUAD_SHADER_DIR`, else `res/shaders` under the working directory, else
/// the copy shipped next to this crate's manifest.
fn shader_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(SHADER_DIR_ENV) {
        return PathBuf::from(dir);
    }

    let local = PathBuf::from(DEFAULT_SHADER_DIR);
    if local.is_dir() {
        return local;
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_SHADER_DIR)
}
