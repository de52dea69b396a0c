pub mod config;
pub use self::config::*;

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{Layer, Registry};

fn build_filter(max_level: &LoggingLevel, level_filter: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(max_level.clone().into())
        .parse_lossy(level_filter)
}

/// The global filter, taken from `level_filter_env` when that variable is set.
fn build_global_filter(config: &TelemetryConfig) -> EnvFilter {
    if !config.level_filter_env.is_empty() {
        if let Ok(directives) = std::env::var(&config.level_filter_env) {
            return build_filter(&config.max_level, &directives);
        }
    }
    build_filter(&config.max_level, &config.level_filter)
}

/// Install the global subscriber: a console layer and an optional file layer.
pub fn initialize_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    if !config.enable {
        return Ok(());
    }
    let filter = build_global_filter(config);
    let console = {
        let config = &config.console;
        if config.enable {
            let enable_debug_logging = config.enable_debug_logging;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_file(enable_debug_logging)
                    .with_line_number(enable_debug_logging)
                    .with_thread_ids(enable_debug_logging)
                    .with_target(enable_debug_logging)
                    .with_filter(build_filter(&config.max_level, &config.level_filter)),
            )
        } else {
            None
        }
    };
    let file = {
        let config = &config.file;
        if config.enable {
            let enable_debug_logging = config.enable_debug_logging;
            let file_appender = RollingFileAppender::new(
                config.rolling_time.clone().into(),
                &config.path,
                &config.prefix,
            );
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_appender)
                    .with_file(enable_debug_logging)
                    .with_line_number(enable_debug_logging)
                    .with_thread_ids(enable_debug_logging)
                    .with_target(enable_debug_logging)
                    .with_filter(build_filter(&config.max_level, &config.level_filter)),
            )
        } else {
            None
        }
    };
    Registry::default().with(filter).with(console).with(file).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing::metadata::LevelFilter;

    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(LevelFilter::from(LoggingLevel::default()), LevelFilter::INFO);
        assert_eq!(LevelFilter::from(LoggingLevel::Off), LevelFilter::OFF);
    }

    #[test]
    fn test_filter_directives_raise_max_level() {
        let filter = build_filter(&LoggingLevel::Warn, "service_billing=debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
        let filter = build_filter(&LoggingLevel::Warn, "");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_global_filter_reads_env_variable() {
        std::env::set_var("MONITOR_TEST_LOG", "trace");
        let config = TelemetryConfig {
            max_level: LoggingLevel::Error,
            level_filter_env: "MONITOR_TEST_LOG".to_owned(),
            ..Default::default()
        };
        assert_eq!(build_global_filter(&config).max_level_hint(), Some(LevelFilter::TRACE));

        let config = TelemetryConfig {
            level_filter_env: "MONITOR_TEST_LOG_UNSET".to_owned(),
            ..config
        };
        assert_eq!(build_global_filter(&config).max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_disabled_telemetry_installs_nothing() {
        let config = TelemetryConfig {
            enable: false,
            ..Default::default()
        };
        assert!(initialize_telemetry(&config).is_ok());
    }
}
