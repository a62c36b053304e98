//! Notifier that records toasts as structured log events.

use codex_env_ports::{LogFields, LoggerPort, Notification, NotificationLevel, NotifierPort};
use std::sync::Arc;

/// Notifier for headless hosts: each toast becomes a `notification.*` log event.
#[derive(Clone)]
pub struct LoggingNotifier {
    logger: Arc<dyn LoggerPort>,
}

impl LoggingNotifier {
    /// Wrap a logger.
    #[must_use]
    pub fn new(logger: Arc<dyn LoggerPort>) -> Self {
        Self { logger }
    }
}

impl NotifierPort for LoggingNotifier {
    fn notify(&self, notification: Notification) {
        let mut fields = LogFields::new();
        if let Some(description) = notification.description.as_deref() {
            fields.insert("description".into(), description.into());
        }
        let fields = (!fields.is_empty()).then_some(fields);
        match notification.level {
            NotificationLevel::Success => {
                self.logger
                    .info("notification.success", &notification.message, fields);
            },
            NotificationLevel::Error => {
                self.logger
                    .warn("notification.error", &notification.message, fields);
            },
        }
    }
}
