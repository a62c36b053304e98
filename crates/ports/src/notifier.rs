//! Toast notification boundary contract.

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// The action succeeded.
    Success,
    /// The action failed.
    Error,
}

/// A user-facing notification: a headline and an optional detail line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Headline.
    pub message: Box<str>,
    /// Optional detail.
    pub description: Option<Box<str>>,
}

/// Boundary contract for toasts.
pub trait NotifierPort: Send + Sync {
    /// Show a notification.
    fn notify(&self, notification: Notification);

    /// Convenience: success toast.
    fn success(&self, message: &str, description: Option<&str>) {
        self.notify(Notification {
            level: NotificationLevel::Success,
            message: message.into(),
            description: description.map(Into::into),
        });
    }

    /// Convenience: error toast.
    fn error(&self, message: &str, description: Option<&str>) {
        self.notify(Notification {
            level: NotificationLevel::Error,
            message: message.into(),
            description: description.map(Into::into),
        });
    }
}
