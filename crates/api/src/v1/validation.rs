//! API v1 DTO validation helpers (shape and limit checks only).
//!
//! Variable rows and defaults are handled by the mappers, which run the
//! domain normalization.

use crate::v1::{CreateEnvironmentRequestDto, UpdateEnvironmentRequestDto, VersionColumnsDto};
use codex_env_domain::validation::validate_version;
use codex_env_domain::{FieldViolation, LanguageRuntime};
use codex_env_shared::{ErrorCode, ErrorEnvelope, Validate, ValidationError};
use std::fmt;

/// Validation failure details for API v1 DTOs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiV1ValidationIssue {
    /// Field name that failed validation.
    pub field: Box<str>,
    /// Human-readable validation error message.
    pub message: Box<str>,
}

impl ApiV1ValidationIssue {
    fn new(field: impl Into<Box<str>>, message: impl Into<Box<str>>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiV1ValidationIssue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ApiV1ValidationIssue {}

impl ValidationError for ApiV1ValidationIssue {
    fn empty(field: &'static str) -> Self {
        FieldViolation::empty(field).into()
    }

    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::new(field, reason)
    }

    fn too_long(field: &'static str, max: usize, actual: usize) -> Self {
        FieldViolation::too_long(field, max, actual).into()
    }
}

impl From<FieldViolation> for ApiV1ValidationIssue {
    fn from(violation: FieldViolation) -> Self {
        Self::new(violation.field(), violation.message())
    }
}

impl From<ApiV1ValidationIssue> for ErrorEnvelope {
    fn from(issue: ApiV1ValidationIssue) -> Self {
        Self::expected(ErrorCode::invalid_field(), issue.message.as_ref())
            .with_metadata("field", issue.field.as_ref())
    }
}

/// Validate a create request DTO.
pub fn validate_create_request(
    dto: &CreateEnvironmentRequestDto,
) -> Result<(), ApiV1ValidationIssue> {
    dto.validate()
}

/// Validate an update request DTO, including the pins it carries.
pub fn validate_update_request(
    dto: &UpdateEnvironmentRequestDto,
) -> Result<(), ApiV1ValidationIssue> {
    dto.validate()?;
    validate_version_columns(&dto.versions)
}

pub(crate) fn validate_name_charset(name: &str) -> Result<(), ApiV1ValidationIssue> {
    codex_env_domain::validation::validate_name_charset(name).map_err(Into::into)
}

/// Check every non-empty version column against its runtime's format.
///
/// Empty columns are allowed: they mean "use the default".
pub fn validate_version_columns(columns: &VersionColumnsDto) -> Result<(), ApiV1ValidationIssue> {
    for runtime in LanguageRuntime::ALL {
        match columns.get(runtime) {
            Some(version) if !version.trim().is_empty() => {
                validate_version(runtime, version.trim())?;
            },
            _ => {},
        }
    }
    Ok(())
}
