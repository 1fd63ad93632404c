use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
///
/// Filter resolution, first match wins:
/// 1. `env_filter`, in `env_logger` syntax (e.g. "warn,sprig_engine::render=trace")
/// 2. the `RUST_LOG` environment variable
/// 3. `default_level`
///
/// `trace_flushes` appends a directive that shows every batch flush of the
/// renderer regardless of the resolved filter.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: LevelFilter,
    pub trace_flushes: bool,
    pub write_style: env_logger::WriteStyle,
    /// Route output through the test harness capture.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            // soft rendering errors are reported at warn
            default_level: LevelFilter::Warn,
            trace_flushes: false,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    /// Filter directives for this config, given the value of `RUST_LOG`.
    pub fn directives(&self, rust_log: Option<&str>) -> String {
        let mut directives = match (&self.env_filter, rust_log) {
            (Some(filter), _) => filter.clone(),
            (None, Some(env)) if !env.trim().is_empty() => env.to_owned(),
            _ => self.default_level.to_string().to_lowercase(),
        };
        if self.trace_flushes {
            directives.push_str(",sprig_engine::render=trace");
        }
        directives
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger, once per process.
///
/// Returns `true` when this call installed it. Later calls, and calls made
/// after a host installed its own `log` backend (a browser console logger,
/// for instance), leave the existing logger in place.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        let directives = config.directives(rust_log.as_deref());

        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(&directives)
            .write_style(config.write_style)
            .is_test(config.is_test);

        match builder.try_init() {
            Ok(()) => {
                installed = true;
                log::debug!("logging initialized ({directives})");
            }
            Err(_) => log::debug!("global logger already installed; keeping it"),
        }
    });
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_beats_environment() {
        let config = LoggingConfig { env_filter: Some("info".into()), ..LoggingConfig::default() };
        assert_eq!(config.directives(Some("debug")), "info");
    }

    #[test]
    fn environment_beats_default_level() {
        let config = LoggingConfig::default();
        assert_eq!(config.directives(Some("sprig_engine=debug")), "sprig_engine=debug");
        assert_eq!(config.directives(Some("  ")), "warn");
        assert_eq!(config.directives(None), "warn");
    }

    #[test]
    fn flush_tracing_is_appended() {
        let config = LoggingConfig { trace_flushes: true, ..LoggingConfig::default() };
        assert_eq!(config.directives(None), "warn,sprig_engine::render=trace");
    }

    #[test]
    fn second_init_is_a_no_op() {
        let config = LoggingConfig { is_test: true, ..LoggingConfig::default() };
        init_logging(config.clone());
        assert!(!init_logging(config));
    }
}
