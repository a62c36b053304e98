//! `environment.<operation>.*` log events shared by the gateway use cases.

use codex_env_ports::{LogFields, LogLevel, LoggerPort};
use codex_env_shared::{ErrorEnvelope, ErrorKind};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Build log fields from literal pairs.
pub(crate) fn log_fields<const N: usize>(entries: [(&str, Value); N]) -> LogFields {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_owned().into_boxed_str(), value))
        .collect()
}

/// One gateway call, from `start` to `completed` or `failed`.
pub(crate) struct OperationLog<'a> {
    logger: Option<&'a dyn LoggerPort>,
    operation: &'static str,
    started_at: Instant,
    base: LogFields,
}

impl<'a> OperationLog<'a> {
    /// Emit `environment.<operation>.start`.
    pub(crate) fn start(
        logger: Option<&'a Arc<dyn LoggerPort>>,
        operation: &'static str,
        base: LogFields,
    ) -> Self {
        let log = Self {
            logger: logger.map(|logger| &**logger),
            operation,
            started_at: Instant::now(),
            base,
        };
        log.emit(
            LogLevel::Info,
            "start",
            &format!("Environment {operation} started"),
            LogFields::new(),
        );
        log
    }

    /// Emit `environment.<operation>.completed` with the elapsed time.
    pub(crate) fn completed(&self, extra: LogFields) {
        let mut fields = extra;
        fields.insert("durationMs".into(), Value::from(self.duration_ms()));
        self.emit(
            LogLevel::Info,
            "completed",
            &format!("Environment {} completed", self.operation),
            fields,
        );
    }

    /// Emit `environment.<operation>.failed`, or `.aborted` for cancellations.
    pub(crate) fn failed(&self, error: &ErrorEnvelope) {
        let Some(logger) = self.logger else {
            return;
        };
        let mut fields = self.base.clone();
        fields.insert("durationMs".into(), Value::from(self.duration_ms()));
        if error.is_cancelled() {
            logger.info(
                &self.event("aborted"),
                &format!("Environment {} aborted", self.operation),
                Some(fields),
            );
            return;
        }
        let level = match error.kind {
            ErrorKind::Expected => LogLevel::Warn,
            ErrorKind::Invariant | ErrorKind::Unexpected => LogLevel::Error,
        };
        logger.failure(level, &self.event("failed"), error, Some(fields));
    }

    /// Emit `environment.<operation>.<suffix>` carrying an error payload.
    pub(crate) fn step_failure(&self, level: LogLevel, suffix: &str, error: &ErrorEnvelope) {
        if let Some(logger) = self.logger {
            logger.failure(level, &self.event(suffix), error, Some(self.base.clone()));
        }
    }

    /// Emit `environment.<operation>.<suffix>`.
    pub(crate) fn emit(&self, level: LogLevel, suffix: &str, message: &str, extra: LogFields) {
        let Some(logger) = self.logger else {
            return;
        };
        let mut fields = self.base.clone();
        fields.extend(extra);
        let event = self.event(suffix);
        match level {
            LogLevel::Debug => logger.debug(&event, message, Some(fields)),
            LogLevel::Info => logger.info(&event, message, Some(fields)),
            LogLevel::Warn => logger.warn(&event, message, Some(fields)),
            LogLevel::Error => logger.error(&event, message, Some(fields)),
        }
    }

    fn event(&self, suffix: &str) -> String {
        format!("environment.{}.{suffix}", self.operation)
    }

    fn duration_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
