//! PostgREST error mapping helpers.

use codex_env_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;

/// PostgREST code for "singular response requested, zero rows returned".
const PGRST_NO_ROWS: &str = "PGRST116";

/// Context payload attached to store error envelopes.
#[derive(Debug, Clone, Copy)]
pub struct StoreErrorContext<'a> {
    /// Operation label, e.g. `postgrest.update_environment`.
    pub operation: &'static str,
    /// Table the request targeted.
    pub table: &'a str,
}

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
pub struct PostgrestErrorBody {
    /// Human-readable message (surfaced to the user).
    #[serde(default)]
    pub message: Option<String>,
    /// Postgres SQLSTATE or `PGRST*` code.
    #[serde(default)]
    pub code: Option<String>,
    /// Extra detail, often naming the violated constraint.
    #[serde(default)]
    pub details: Option<String>,
    /// Suggested fix.
    #[serde(default)]
    pub hint: Option<String>,
}

/// Map a non-success HTTP response into a store envelope.
///
/// PostgREST bodies keep their own message so it can reach the user;
/// gateway timeouts and bare 5xx responses are transport failures.
pub fn map_http_error(status: u16, payload: &[u8], ctx: StoreErrorContext<'_>) -> ErrorEnvelope {
    let body = serde_json::from_slice::<PostgrestErrorBody>(payload).ok();
    let message = body
        .as_ref()
        .and_then(|body| body.message.as_deref())
        .map(str::trim)
        .filter(|message| !message.is_empty());

    let mut envelope = match (status, message) {
        (408 | 504, _) => ErrorEnvelope::unexpected(
            ErrorCode::store_timeout(),
            format!("store request timed out (HTTP {status})"),
            ErrorClass::Retriable,
        ),
        (500..=599, None) => ErrorEnvelope::unexpected(
            ErrorCode::store_transport(),
            format!("store unavailable (HTTP {status})"),
            ErrorClass::Retriable,
        ),
        (_, message) => {
            let code = if body.as_ref().and_then(|body| body.code.as_deref()) == Some(PGRST_NO_ROWS)
            {
                ErrorCode::store_not_found()
            } else {
                ErrorCode::store_rejected()
            };
            let message = message.map_or_else(
                || format!("store rejected the request (HTTP {status})"),
                str::to_string,
            );
            ErrorEnvelope::expected(code, message)
        },
    };

    envelope = envelope
        .with_metadata("operation", ctx.operation)
        .with_metadata("table", ctx.table)
        .with_metadata("http_status", status.to_string());
    if let Some(body) = body {
        if let Some(code) = body.code {
            envelope = envelope.with_metadata("pg_code", code);
        }
        if let Some(details) = body.details {
            envelope = envelope.with_metadata("details", details);
        }
        if let Some(hint) = body.hint {
            envelope = envelope.with_metadata("hint", hint);
        }
    }
    envelope
}

/// Map a reqwest transport error into a store envelope.
pub fn map_transport_error(error: &reqwest::Error, ctx: StoreErrorContext<'_>) -> ErrorEnvelope {
    let envelope = if error.is_timeout() {
        ErrorEnvelope::unexpected(
            ErrorCode::store_timeout(),
            format!("store request timed out: {error}"),
            ErrorClass::Retriable,
        )
    } else {
        ErrorEnvelope::unexpected(
            ErrorCode::store_transport(),
            format!("store request failed: {error}"),
            ErrorClass::Retriable,
        )
    };
    envelope
        .with_metadata("operation", ctx.operation)
        .with_metadata("table", ctx.table)
}

/// A response body that does not decode into the expected rows.
pub fn invalid_response(message: impl Into<String>, ctx: StoreErrorContext<'_>) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::store_invalid_response(),
        message,
        ErrorClass::NonRetriable,
    )
    .with_metadata("operation", ctx.operation)
    .with_metadata("table", ctx.table)
}

/// The request did not complete within the configured timeout.
pub fn timeout_error(ctx: StoreErrorContext<'_>) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::store_timeout(),
        "store request timed out",
        ErrorClass::Retriable,
    )
    .with_metadata("operation", ctx.operation)
    .with_metadata("table", ctx.table)
}
