//! Test fixtures for shared error codes and envelopes.

use codex_env_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::cancelled(),
        ErrorCode::invalid_input(),
        ErrorCode::variable_incomplete(),
        ErrorCode::variable_duplicate_key(),
        ErrorCode::store_rejected(),
        ErrorCode::store_not_found(),
        ErrorCode::store_transport(),
        ErrorCode::store_timeout(),
        ErrorCode::inconsistent_state(),
    ]
}

/// A cancellation error fixture.
pub fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("cancelled")
}

/// A backend rejection carrying the backend's own message.
pub fn store_rejected_error(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::store_rejected(), message)
        .with_metadata("http_status", "409")
}

/// A transport failure, the kind the gateway hides behind a generic message.
pub fn store_transport_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::store_transport(),
        "connection reset by peer",
        ErrorClass::Retriable,
    )
}

/// A retriable timeout error fixture.
pub fn store_timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::store_timeout(),
        "store request timed out",
        ErrorClass::Retriable,
    )
}
