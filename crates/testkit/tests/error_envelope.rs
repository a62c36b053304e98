//! Integration tests for shared error propagation.

use codex_env_shared::{ErrorClass, ErrorCode, ErrorKind};
use codex_env_testkit::errors::{
    cancelled_error, store_rejected_error, store_timeout_error, store_transport_error,
};

#[test]
fn error_envelope_crosses_crates() {
    let timeout = store_timeout_error();
    assert_eq!(timeout.code, ErrorCode::store_timeout());
    assert_eq!(timeout.class, ErrorClass::Retriable);

    let boxed: Box<dyn std::error::Error> = Box::new(timeout);
    assert!(boxed.to_string().contains("timed out"));

    assert!(cancelled_error().is_cancelled());
}

#[test]
fn store_fixtures_carry_the_expected_kinds() {
    let rejected = store_rejected_error("duplicate key value");
    assert_eq!(rejected.kind, ErrorKind::Expected);
    assert_eq!(rejected.message, "duplicate key value");
    assert_eq!(
        rejected.metadata.get("http_status").map(String::as_str),
        Some("409")
    );

    assert_eq!(store_transport_error().kind, ErrorKind::Unexpected);
}
