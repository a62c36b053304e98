//! Structured JSON logger adapter.

use crate::log_sink::LogSink;
use codex_env_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use codex_env_shared::redaction::{REDACTED, is_secret_key};
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON logger emitting one line per event.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

impl JsonLogger {
    /// Create a JSON logger backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum log level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn encode(&self, event: LogEvent) -> String {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());

        let mut payload = serde_json::Map::new();
        payload.insert("timestampMs".to_string(), Value::from(now_epoch_ms()));
        payload.insert("level".to_string(), Value::from(event.level.as_str()));
        payload.insert("event".to_string(), Value::from(&*event.event));
        payload.insert("message".to_string(), Value::from(&*event.message));
        if !fields.is_empty() {
            let mut fields: serde_json::Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect();
            redact_object(&mut fields);
            payload.insert("fields".to_string(), Value::Object(fields));
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".to_string(), error);
        }

        serde_json::to_string(&Value::Object(payload)).map_or_else(
            |_| {
                "{\"timestampMs\":0,\"level\":\"error\",\"event\":\"logger.serialize_failed\",\"message\":\"log serialization failed\"}\n"
                    .to_string()
            },
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        )
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        let line = self.encode(event);
        self.sink.write_line(&line);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merged,
            min_level: self.min_level,
        })
    }
}

fn redact_object(map: &mut serde_json::Map<String, Value>) {
    for (key, nested) in map.iter_mut() {
        if is_secret_key(key) {
            *nested = Value::String(REDACTED.to_string());
        } else {
            redact_value(nested);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => redact_object(map),
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {},
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::MemoryLogSink;
    use serde_json::json;

    fn parse_single(sink: &MemoryLogSink) -> Result<Value, Box<dyn std::error::Error>> {
        let lines = sink.take();
        assert_eq!(lines.len(), 1);
        Ok(serde_json::from_str(lines[0].trim())?)
    }

    #[test]
    fn json_logger_redacts_sensitive_fields() -> Result<(), Box<dyn std::error::Error>> {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone()).with_min_level(LogLevel::Debug);

        let mut fields = LogFields::new();
        fields.insert("anonKey".into(), json!("secret"));
        fields.insert("environmentId".into(), json!("env_1"));

        logger.log(LogEvent {
            event: "environment.create.failed".into(),
            level: LogLevel::Warn,
            message: "testing".into(),
            fields: Some(fields),
            error: Some(json!({
                "code": "store:rejected",
                "metadata": { "access_token": "nope", "table": "environments" }
            })),
        });

        let payload = parse_single(&sink)?;
        assert_eq!(payload["level"], "warn");
        assert_eq!(payload["fields"]["anonKey"], REDACTED);
        assert_eq!(payload["fields"]["environmentId"], "env_1");
        assert_eq!(payload["error"]["metadata"]["access_token"], REDACTED);
        assert_eq!(payload["error"]["metadata"]["table"], "environments");
        Ok(())
    }

    #[test]
    fn events_below_min_level_are_dropped() {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone()).with_min_level(LogLevel::Warn);

        logger.info("environment.list.start", "listing", None);
        logger.debug("environment.list.completed", "listed", None);
        assert!(sink.take().is_empty());

        logger.error("environment.create.inconsistent", "orphan", None);
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn child_logger_merges_fields() -> Result<(), Box<dyn std::error::Error>> {
        let sink = Arc::new(MemoryLogSink::default());
        let mut base = LogFields::new();
        base.insert("service".into(), json!("environments"));
        let logger = JsonLogger::new(sink.clone()).with_base_fields(base);

        let mut extra = LogFields::new();
        extra.insert("correlationId".into(), json!("req_123"));
        let child = logger.child(extra);
        child.info("environment.update.start", "updating", None);

        let payload = parse_single(&sink)?;
        assert_eq!(payload["fields"]["correlationId"], "req_123");
        assert_eq!(payload["fields"]["service"], "environments");
        Ok(())
    }
}
