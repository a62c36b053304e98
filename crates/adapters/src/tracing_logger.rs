//! Bridge from [`LoggerPort`] events to the `tracing` ecosystem.

use codex_env_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use codex_env_shared::redaction::{REDACTED, is_secret_key};
use serde_json::Value;

/// Logger that re-emits events as `tracing` events under the
/// `codex_env` target. Fields are flattened into one JSON string.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Create a bridge with no base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());
        let fields: serde_json::Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| {
                let value = if is_secret_key(&key) {
                    Value::String(REDACTED.to_string())
                } else {
                    value
                };
                (key.into_string(), value)
            })
            .collect();
        let fields = Value::Object(fields).to_string();
        let error = event.error.map(|error| error.to_string()).unwrap_or_default();
        let name = &*event.event;
        let message = &*event.message;

        match event.level {
            LogLevel::Debug => {
                tracing::debug!(target: "codex_env", event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Info => {
                tracing::info!(target: "codex_env", event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Warn => {
                tracing::warn!(target: "codex_env", event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Error => {
                tracing::error!(target: "codex_env", event = name, fields = %fields, error = %error, "{message}");
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn logging_without_a_subscriber_is_a_no_op() {
        let mut fields = LogFields::new();
        fields.insert("environmentId".into(), json!("env_1"));
        let logger = TracingLogger::new().child(fields);
        logger.warn("environment.create.compensating", "rolling back", None);
    }
}
