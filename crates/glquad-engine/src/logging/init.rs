use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "glquad_engine=debug,glutin=warn"). When unset, `RUST_LOG` is consulted,
/// then `default_level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// Where the active filter came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterSource {
    Explicit(String),
    Env(String),
    Level(log::LevelFilter),
}

fn resolve_filter(config: &LoggingConfig, rust_log: Option<String>) -> FilterSource {
    if let Some(filter) = &config.env_filter {
        FilterSource::Explicit(filter.clone())
    } else if let Some(filter) = rust_log.filter(|f| !f.trim().is_empty()) {
        FilterSource::Env(filter)
    } else {
        FilterSource::Level(config.default_level)
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; later calls are ignored. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match resolve_filter(&config, std::env::var("RUST_LOG").ok()) {
            FilterSource::Explicit(filter) | FilterSource::Env(filter) => {
                builder.parse_filters(&filter);
            }
            FilterSource::Level(level) => {
                builder.filter_level(level);
            }
        }

        builder.write_style(config.write_style);

        // try_init: a test harness may already have installed a logger.
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_env() {
        let config = LoggingConfig {
            env_filter: Some("warn".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_filter(&config, Some("trace".into())),
            FilterSource::Explicit("warn".into())
        );
    }

    #[test]
    fn env_used_when_not_blank() {
        let config = LoggingConfig::default();
        assert_eq!(
            resolve_filter(&config, Some("glquad_engine=debug".into())),
            FilterSource::Env("glquad_engine=debug".into())
        );
        assert_eq!(
            resolve_filter(&config, Some("  ".into())),
            FilterSource::Level(log::LevelFilter::Info)
        );
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::default());
    }
}
