//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for decorating envelope errors on their way up.
pub trait ResultExt<T> {
    /// Map the success value, preserving the error.
    fn map_ok<U, F>(self, op: F) -> Result<U>
    where
        F: FnOnce(T) -> U;

    /// Attach one metadata entry to the error, if any.
    fn with_metadata(self, key: &'static str, value: impl Into<String>) -> Result<T>;

    /// Tag the error with the operation that produced it.
    fn for_operation(self, operation: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn map_ok<U, F>(self, op: F) -> Result<U>
    where
        F: FnOnce(T) -> U,
    {
        self.map(op)
    }

    fn with_metadata(self, key: &'static str, value: impl Into<String>) -> Result<T> {
        self.map_err(|error| error.with_metadata(key, value))
    }

    fn for_operation(self, operation: &'static str) -> Result<T> {
        self.with_metadata("operation", operation)
    }
}
