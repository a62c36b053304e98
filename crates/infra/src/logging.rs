//! Logger selection and `tracing` subscriber installation.

use crate::InfraResult;
use codex_env_adapters::{JsonLogger, StderrLogSink, TracingLogger};
use codex_env_config::{LogFormat, LogLevelSetting, LoggingConfig};
use codex_env_ports::{LogLevel, LoggerPort};
use codex_env_shared::{ErrorCode, ErrorEnvelope};
use std::sync::Arc;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Map the configured level onto the port level.
#[must_use]
pub const fn log_level(setting: LogLevelSetting) -> LogLevel {
    match setting {
        LogLevelSetting::Debug => LogLevel::Debug,
        LogLevelSetting::Info => LogLevel::Info,
        LogLevelSetting::Warn => LogLevel::Warn,
        LogLevelSetting::Error => LogLevel::Error,
    }
}

const fn level_filter(setting: LogLevelSetting) -> LevelFilter {
    match setting {
        LogLevelSetting::Debug => LevelFilter::DEBUG,
        LogLevelSetting::Info => LevelFilter::INFO,
        LogLevelSetting::Warn => LevelFilter::WARN,
        LogLevelSetting::Error => LevelFilter::ERROR,
    }
}

/// Build the logger selected by `logging.format`.
///
/// The `json` logger writes to stderr; the `tracing` logger needs a
/// subscriber (see [`install_tracing_subscriber`]).
#[must_use]
pub fn build_logger(config: LoggingConfig) -> Arc<dyn LoggerPort> {
    match config.format {
        LogFormat::Json => Arc::new(
            JsonLogger::new(Arc::new(StderrLogSink)).with_min_level(log_level(config.level)),
        ),
        LogFormat::Tracing => Arc::new(TracingLogger::new()),
    }
}

/// Install a global JSON `tracing` subscriber.
///
/// `RUST_LOG` directives win over the configured level. Fails when a global
/// subscriber is already set.
pub fn install_tracing_subscriber(config: LoggingConfig) -> InfraResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter(config.level).into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("infra", "subscriber_already_set"),
                format!("tracing subscriber could not be installed: {error}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_env_ports::LogFields;

    #[test]
    fn levels_map_one_to_one() {
        assert_eq!(log_level(LogLevelSetting::Debug), LogLevel::Debug);
        assert_eq!(log_level(LogLevelSetting::Warn), LogLevel::Warn);
        assert_eq!(level_filter(LogLevelSetting::Error), LevelFilter::ERROR);
    }

    #[test]
    fn both_formats_accept_events() {
        for format in [LogFormat::Json, LogFormat::Tracing] {
            let logger = build_logger(LoggingConfig {
                level: LogLevelSetting::Error,
                format,
            });
            logger.info("infra.test", "filtered out", None);
            let child = logger.child(LogFields::new());
            child.debug("infra.test", "filtered out", None);
        }
    }
}
