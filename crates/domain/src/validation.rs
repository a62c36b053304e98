//! Field-level validation rules and the structured violation they report.

use crate::environment::{ContainerImage, SetupScript};
use crate::runtime::{LanguageRuntime, VersionPins};
use codex_env_shared::{ErrorCode, ErrorEnvelope, ValidationError};
use std::fmt;

/// Maximum environment name length, in characters.
pub const NAME_MAX_LEN: usize = 100;
/// Maximum description length, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Message for a variable row with only one of key/value.
pub const VARIABLE_INCOMPLETE_MESSAGE: &str =
    "Environment variables and secrets require both a key and value.";

/// Message for manual mode without a script.
pub const SETUP_SCRIPT_REQUIRED_MESSAGE: &str =
    "Setup script is required when setup script mode is manual";

/// Which rule a [`FieldViolation`] broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationRule {
    /// Required value missing.
    Empty,
    /// Value present but malformed.
    Invalid,
    /// Text longer than allowed.
    TooLong,
    /// Variable row with only a key or only a value.
    VariableIncomplete,
    /// Variable key fails `^[A-Z][A-Z0-9_]*$`.
    VariableKeyFormat,
    /// Variable key seen earlier in the same submission.
    VariableDuplicateKey,
}

impl ViolationRule {
    fn error_code(self) -> ErrorCode {
        match self {
            Self::Empty | Self::Invalid | Self::TooLong => ErrorCode::invalid_field(),
            Self::VariableIncomplete => ErrorCode::variable_incomplete(),
            Self::VariableKeyFormat => ErrorCode::variable_key_format(),
            Self::VariableDuplicateKey => ErrorCode::variable_duplicate_key(),
        }
    }
}

/// The first rule a candidate environment broke: which field and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    field: Box<str>,
    message: Box<str>,
    rule: ViolationRule,
}

impl FieldViolation {
    /// Build a violation for a field.
    pub fn new(field: impl Into<Box<str>>, rule: ViolationRule, message: impl Into<Box<str>>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule,
        }
    }

    /// Column (or pseudo-field such as `environment_variables`) at fault.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Rule that was broken.
    #[must_use]
    pub const fn rule(&self) -> ViolationRule {
        self.rule
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl std::error::Error for FieldViolation {}

impl ValidationError for FieldViolation {
    fn empty(field: &'static str) -> Self {
        Self::new(
            field,
            ViolationRule::Empty,
            format!("{} is required", field_label(field)),
        )
    }

    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::new(field, ViolationRule::Invalid, reason)
    }

    fn too_long(field: &'static str, max: usize, actual: usize) -> Self {
        Self::new(
            field,
            ViolationRule::TooLong,
            format!(
                "{} must be {max} characters or less (got {actual})",
                field_label(field)
            ),
        )
    }
}

impl From<FieldViolation> for ErrorEnvelope {
    fn from(violation: FieldViolation) -> Self {
        Self::expected(violation.rule.error_code(), violation.message.as_ref())
            .with_metadata("field", violation.field.as_ref())
    }
}

/// "`github_org`" → "Github org".
fn field_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Name charset: `[a-zA-Z0-9_-]+` on the trimmed value.
pub fn validate_name_charset(name: &str) -> Result<(), FieldViolation> {
    let trimmed = name.trim();
    let valid = trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(FieldViolation::invalid(
            "name",
            "Name may only contain letters, numbers, hyphens, and underscores",
        ))
    }
}

/// Full name rule set, for callers outside the derive (patches).
pub fn validate_name(name: &str) -> Result<(), FieldViolation> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FieldViolation::empty("name"));
    }
    validate_max_len("name", trimmed, NAME_MAX_LEN)?;
    validate_name_charset(trimmed)
}

/// Description length rule, for callers outside the derive (patches).
pub fn validate_description(description: &str) -> Result<(), FieldViolation> {
    validate_max_len("description", description.trim(), DESCRIPTION_MAX_LEN)
}

fn validate_max_len(field: &'static str, value: &str, max: usize) -> Result<(), FieldViolation> {
    let actual = value.chars().count();
    if actual > max {
        return Err(FieldViolation::too_long(field, max, actual));
    }
    Ok(())
}

/// One runtime pin against its format.
pub fn validate_version(runtime: LanguageRuntime, version: &str) -> Result<(), FieldViolation> {
    let format = runtime.version_format();
    if format.matches(version) {
        return Ok(());
    }
    Err(FieldViolation::new(
        runtime.column(),
        ViolationRule::Invalid,
        format!(
            "{} version must look like {} (got \"{version}\")",
            runtime.label(),
            format.describe()
        ),
    ))
}

/// Every runtime pin against its format; first failure wins.
pub fn validate_version_pins(pins: &VersionPins) -> Result<(), FieldViolation> {
    pins.iter()
        .try_for_each(|(runtime, version)| validate_version(runtime, version))
}

/// Manual mode must carry a non-blank script.
pub fn validate_setup_script(setup: &SetupScript) -> Result<(), FieldViolation> {
    match setup {
        SetupScript::Manual { script } if script.trim().is_empty() => Err(FieldViolation::new(
            "setup_script",
            ViolationRule::Empty,
            SETUP_SCRIPT_REQUIRED_MESSAGE,
        )),
        SetupScript::Automatic | SetupScript::Manual { .. } => Ok(()),
    }
}

/// Parse a container image name, reporting a field violation.
pub fn parse_container_image(value: &str) -> Result<ContainerImage, FieldViolation> {
    ContainerImage::parse(value.trim()).ok_or_else(|| {
        FieldViolation::invalid(
            "container_image",
            "Container image must be one of universal, node, python",
        )
    })
}
