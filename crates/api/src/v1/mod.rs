//! API v1 DTOs and helpers.

mod mappers;
mod schema;
mod types;
mod validation;

pub use mappers::{
    GATEWAY_UNEXPECTED_MESSAGE, environment_insert_from_new, gateway_failure_message,
    new_environment_from_create_request, patch_body, patch_from_update_request,
    pins_from_columns, record_from_row, result_to_gateway_result, row_from_record,
    variable_inserts, version_columns_from_pins,
};
pub use schema::{create_environment_request_schema, update_environment_request_schema};
pub use types::*;
pub use validation::{
    ApiV1ValidationIssue, validate_create_request, validate_update_request,
    validate_version_columns,
};
