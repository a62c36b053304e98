//! JSON Schema exports for API v1 request DTOs.

use crate::v1::{CreateEnvironmentRequestDto, UpdateEnvironmentRequestDto};
use schemars::{Schema, schema_for};

/// JSON Schema for `CreateEnvironmentRequestDto`.
#[must_use]
pub fn create_environment_request_schema() -> Schema {
    schema_for!(CreateEnvironmentRequestDto)
}

/// JSON Schema for `UpdateEnvironmentRequestDto`.
#[must_use]
pub fn update_environment_request_schema() -> Schema {
    schema_for!(UpdateEnvironmentRequestDto)
}
