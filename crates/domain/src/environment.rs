//! Environment records, the validated insert shape, and partial patches.

use crate::primitives::EnvironmentId;
use crate::runtime::{LanguageRuntime, VersionPins};
use crate::validation::{
    FieldViolation, SETUP_SCRIPT_REQUIRED_MESSAGE, ViolationRule, parse_container_image,
    validate_description, validate_name, validate_version,
};
use crate::variables::EnvironmentVariable;
use codex_env_shared::{Validate, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Base container image an environment runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerImage {
    /// Multi-language image with every runtime installed.
    #[default]
    Universal,
    /// Node.js only.
    Node,
    /// Python only.
    Python,
}

impl ContainerImage {
    /// Every image, in picker order.
    pub const ALL: [Self; 3] = [Self::Universal, Self::Node, Self::Python];

    /// Stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Universal => "universal",
            Self::Node => "node",
            Self::Python => "python",
        }
    }

    /// Picker label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Universal => "Universal",
            Self::Node => "Node.js",
            Self::Python => "Python",
        }
    }

    /// Parse a stored value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|image| image.as_str() == value)
    }
}

impl fmt::Display for ContainerImage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Whether the environment installs dependencies itself or runs a user script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupScriptMode {
    /// Dependencies are detected and installed automatically.
    #[default]
    Automatic,
    /// The user-supplied setup script runs.
    Manual,
}

impl SetupScriptMode {
    /// Stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }

    /// Two-valued code used by the mode toggle (`"1"` automatic, `"2"` manual).
    #[must_use]
    pub const fn ui_code(self) -> &'static str {
        match self {
            Self::Automatic => "1",
            Self::Manual => "2",
        }
    }

    /// Coerce a toggle code or stored value. Anything unrecognized is automatic.
    #[must_use]
    pub fn from_ui_code(code: &str) -> Self {
        match code.trim() {
            "2" | "manual" => Self::Manual,
            _ => Self::Automatic,
        }
    }

    /// Strict parse of a stored value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "automatic" => Some(Self::Automatic),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for SetupScriptMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Setup behavior of a new environment. The script only exists in manual mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SetupScript {
    /// No script is stored.
    #[default]
    Automatic,
    /// The given script is stored and run.
    Manual {
        /// Script text.
        script: Box<str>,
    },
}

impl SetupScript {
    /// Stored mode.
    #[must_use]
    pub const fn mode(&self) -> SetupScriptMode {
        match self {
            Self::Automatic => SetupScriptMode::Automatic,
            Self::Manual { .. } => SetupScriptMode::Manual,
        }
    }

    /// Stored script; `None` unless manual.
    #[must_use]
    pub fn script(&self) -> Option<&str> {
        match self {
            Self::Automatic => None,
            Self::Manual { script } => Some(&**script),
        }
    }
}

/// A stored `environments` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRecord {
    /// Row identifier.
    pub id: EnvironmentId,
    /// Display name.
    pub name: Box<str>,
    /// Optional description.
    pub description: Option<Box<str>>,
    /// GitHub organization.
    pub github_org: Option<Box<str>>,
    /// GitHub repository.
    pub github_repo: Option<Box<str>>,
    /// Container image.
    pub container_image: ContainerImage,
    /// Runtime pins.
    pub versions: VersionPins,
    /// Setup mode as stored.
    pub setup_script_mode: SetupScriptMode,
    /// Setup script as stored.
    pub setup_script: Option<Box<str>>,
    /// Whether container caching is on.
    pub container_caching_enabled: bool,
    /// Whether the container may reach the internet.
    pub internet_access_enabled: bool,
    /// Backend-assigned creation timestamp.
    pub created_at: Option<Box<str>>,
    /// Backend-assigned update timestamp.
    pub updated_at: Option<Box<str>>,
    /// Backend-assigned creator.
    pub created_by: Option<Box<str>>,
}

/// A fully normalized environment, ready for insertion with its variables.
#[derive(Debug, Clone, PartialEq, Eq, Default, codex_env_validate_derive::Validate)]
#[validate(error = "FieldViolation")]
pub struct NewEnvironment {
    /// Display name (trimmed).
    #[validate(non_empty, max_len(100), custom = "crate::validation::validate_name_charset")]
    pub name: Box<str>,
    /// Description (trimmed, `None` when blank).
    #[validate(max_len(500))]
    pub description: Option<Box<str>>,
    /// GitHub organization.
    pub github_org: Option<Box<str>>,
    /// GitHub repository.
    pub github_repo: Option<Box<str>>,
    /// Container image.
    pub container_image: ContainerImage,
    /// Runtime pins.
    #[validate(custom = "crate::validation::validate_version_pins")]
    pub versions: VersionPins,
    /// Setup mode and script.
    #[validate(custom = "crate::validation::validate_setup_script")]
    pub setup: SetupScript,
    /// Whether container caching is on.
    pub container_caching_enabled: bool,
    /// Whether the container may reach the internet.
    pub internet_access_enabled: bool,
    /// Variables and secrets, variables first.
    #[validate(field = "environment_variables", custom = "crate::variables::validate_variable_set")]
    pub variables: Vec<EnvironmentVariable>,
}

/// An editable column of the `environments` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvironmentField {
    /// `name`
    Name,
    /// `description`
    Description,
    /// `github_org`
    GithubOrg,
    /// `github_repo`
    GithubRepo,
    /// `container_image`
    ContainerImage,
    /// `<runtime>_version`
    Version(LanguageRuntime),
    /// `setup_script_mode`
    SetupScriptMode,
    /// `setup_script`
    SetupScript,
    /// `container_caching_enabled`
    ContainerCachingEnabled,
    /// `internet_access_enabled`
    InternetAccessEnabled,
}

impl EnvironmentField {
    /// Every editable field, in column order.
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Name, Self::Description, Self::GithubOrg, Self::GithubRepo, Self::ContainerImage]
            .into_iter()
            .chain(LanguageRuntime::ALL.into_iter().map(Self::Version))
            .chain([
                Self::SetupScriptMode,
                Self::SetupScript,
                Self::ContainerCachingEnabled,
                Self::InternetAccessEnabled,
            ])
    }

    /// Column name.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::GithubOrg => "github_org",
            Self::GithubRepo => "github_repo",
            Self::ContainerImage => "container_image",
            Self::Version(runtime) => runtime.column(),
            Self::SetupScriptMode => "setup_script_mode",
            Self::SetupScript => "setup_script",
            Self::ContainerCachingEnabled => "container_caching_enabled",
            Self::InternetAccessEnabled => "internet_access_enabled",
        }
    }

    /// Look a field up by column name.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        Self::all().find(|field| field.column() == column)
    }
}

impl fmt::Display for EnvironmentField {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.column())
    }
}

/// Value written to one column by a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchValue {
    /// Write SQL `NULL`.
    Null,
    /// Write a text value.
    Text(Box<str>),
    /// Write a boolean value.
    Flag(bool),
}

impl PatchValue {
    /// Text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(&**text),
            Self::Null | Self::Flag(_) => None,
        }
    }

    /// Null, or text that is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Flag(_) => false,
        }
    }
}

/// A partial update. Fields absent from the map are left untouched by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvironmentPatch {
    fields: BTreeMap<EnvironmentField, PatchValue>,
}

impl EnvironmentPatch {
    /// Empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Text values are stored trimmed.
    pub fn set(&mut self, field: EnvironmentField, value: PatchValue) {
        let value = match value {
            PatchValue::Text(text) => PatchValue::Text(text.trim().into()),
            other => other,
        };
        self.fields.insert(field, value);
    }

    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(mut self, field: EnvironmentField, value: PatchValue) -> Self {
        self.set(field, value);
        self
    }

    /// Builder shortcut for a text value.
    #[must_use]
    pub fn with_text(self, field: EnvironmentField, value: impl Into<Box<str>>) -> Self {
        self.with(field, PatchValue::Text(value.into()))
    }

    /// Value set for a field, if any.
    #[must_use]
    pub fn get(&self, field: EnvironmentField) -> Option<&PatchValue> {
        self.fields.get(&field)
    }

    /// Remove a field.
    pub fn remove(&mut self, field: EnvironmentField) -> Option<PatchValue> {
        self.fields.remove(&field)
    }

    /// Keep only fields matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(EnvironmentField, &PatchValue) -> bool) {
        self.fields.retain(|field, value| keep(*field, value));
    }

    /// Returns true when the patch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate fields in column order.
    pub fn iter(&self) -> impl Iterator<Item = (EnvironmentField, &PatchValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    /// Setup mode written by this patch, if it writes a recognizable one.
    #[must_use]
    pub fn setup_script_mode(&self) -> Option<SetupScriptMode> {
        self.get(EnvironmentField::SetupScriptMode)
            .and_then(PatchValue::as_text)
            .and_then(SetupScriptMode::parse)
    }

    /// Switching to automatic also clears the stored script.
    #[must_use]
    pub fn with_setup_script_rule(mut self) -> Self {
        if self.setup_script_mode() == Some(SetupScriptMode::Automatic) {
            self.set(EnvironmentField::SetupScript, PatchValue::Null);
        }
        self
    }
}

impl Validate for EnvironmentPatch {
    type Error = FieldViolation;

    fn validate(&self) -> Result<(), Self::Error> {
        for (field, value) in self.iter() {
            validate_patch_value(field, value)?;
        }
        validate_patch_setup_script(self)
    }
}

fn validate_patch_value(field: EnvironmentField, value: &PatchValue) -> Result<(), FieldViolation> {
    let column = field.column();
    match (field, value) {
        (EnvironmentField::Name, PatchValue::Null) => Err(FieldViolation::empty("name")),
        (EnvironmentField::Name, PatchValue::Text(text)) => validate_name(text),
        (EnvironmentField::Description, PatchValue::Text(text)) => validate_description(text),
        (
            EnvironmentField::Description
            | EnvironmentField::GithubOrg
            | EnvironmentField::GithubRepo
            | EnvironmentField::SetupScript,
            PatchValue::Null | PatchValue::Text(_),
        ) => Ok(()),
        (EnvironmentField::ContainerImage, PatchValue::Text(text)) => {
            parse_container_image(text).map(|_| ())
        },
        (EnvironmentField::Version(runtime), PatchValue::Text(text)) => {
            validate_version(runtime, text)
        },
        (EnvironmentField::SetupScriptMode, PatchValue::Text(text)) => {
            SetupScriptMode::parse(text).map(|_| ()).ok_or_else(|| {
                FieldViolation::new(
                    column,
                    ViolationRule::Invalid,
                    "Setup script mode must be automatic or manual",
                )
            })
        },
        (EnvironmentField::ContainerCachingEnabled | EnvironmentField::InternetAccessEnabled, PatchValue::Flag(_)) => {
            Ok(())
        },
        _ => Err(FieldViolation::new(
            column,
            ViolationRule::Invalid,
            format!("{column} has the wrong type"),
        )),
    }
}

fn validate_patch_setup_script(patch: &EnvironmentPatch) -> Result<(), FieldViolation> {
    let script = patch.get(EnvironmentField::SetupScript);
    let script_is_blank = script.is_none_or(PatchValue::is_blank);
    match patch.setup_script_mode() {
        Some(SetupScriptMode::Manual) if script_is_blank => Err(FieldViolation::new(
            "setup_script",
            ViolationRule::Empty,
            SETUP_SCRIPT_REQUIRED_MESSAGE,
        )),
        Some(SetupScriptMode::Automatic) if !script_is_blank => Err(FieldViolation::new(
            "setup_script",
            ViolationRule::Invalid,
            "Setup script must be empty when setup script mode is automatic",
        )),
        None if !script_is_blank => Err(FieldViolation::new(
            "setup_script",
            ViolationRule::Invalid,
            "Setup script can only be changed together with setup script mode manual",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::EnvironmentVariable;
    use crate::primitives::VariableName;
    use codex_env_shared::SecretString;

    fn valid_environment() -> NewEnvironment {
        NewEnvironment {
            name: "ci-env".into(),
            ..NewEnvironment::default()
        }
    }

    #[test]
    fn default_environment_with_name_is_valid() {
        assert!(valid_environment().validate().is_ok());
    }

    #[test]
    fn derived_rules_report_first_violation() {
        let environment = NewEnvironment {
            name: "  ".into(),
            description: Some("x".repeat(501).into()),
            ..NewEnvironment::default()
        };
        let violation = environment.validate().err();
        assert_eq!(violation.as_ref().map(FieldViolation::field), Some("name"));
        assert_eq!(violation.map(|v| v.rule()), Some(ViolationRule::Empty));
    }

    #[test]
    fn description_limit_is_enforced() {
        let environment = NewEnvironment {
            description: Some("x".repeat(501).into()),
            ..valid_environment()
        };
        let violation = environment.validate().err();
        assert_eq!(violation.map(|v| v.rule()), Some(ViolationRule::TooLong));
    }

    #[test]
    fn name_charset_is_enforced() {
        let environment = NewEnvironment {
            name: "ci env".into(),
            ..valid_environment()
        };
        assert_eq!(
            environment.validate().err().map(|v| v.rule()),
            Some(ViolationRule::Invalid)
        );
    }

    #[test]
    fn malformed_pin_is_reported_by_column() {
        let environment = NewEnvironment {
            versions: VersionPins::default().with(LanguageRuntime::Java, "21.0"),
            ..valid_environment()
        };
        let violation = environment.validate().err();
        assert_eq!(
            violation.as_ref().map(FieldViolation::field),
            Some("java_version")
        );
    }

    #[test]
    fn duplicate_typed_variables_are_rejected() -> Result<(), crate::PrimitiveError> {
        let name = VariableName::parse("TOKEN")?;
        let environment = NewEnvironment {
            variables: vec![
                EnvironmentVariable::new(name.clone(), SecretString::from("a"), false),
                EnvironmentVariable::new(name, SecretString::from("b"), true),
            ],
            ..valid_environment()
        };
        let violation = environment.validate().err();
        assert_eq!(
            violation.map(|v| v.rule()),
            Some(ViolationRule::VariableDuplicateKey)
        );
        Ok(())
    }

    #[test]
    fn setup_script_exposes_script_only_when_manual() {
        assert_eq!(SetupScript::Automatic.script(), None);
        let manual = SetupScript::Manual {
            script: "make setup".into(),
        };
        assert_eq!(manual.script(), Some("make setup"));
        assert_eq!(manual.mode(), SetupScriptMode::Manual);
    }

    #[test]
    fn ui_codes_coerce_to_modes() {
        assert_eq!(SetupScriptMode::from_ui_code("1"), SetupScriptMode::Automatic);
        assert_eq!(SetupScriptMode::from_ui_code("2"), SetupScriptMode::Manual);
        assert_eq!(SetupScriptMode::from_ui_code("manual"), SetupScriptMode::Manual);
        assert_eq!(SetupScriptMode::from_ui_code("x"), SetupScriptMode::Automatic);
        assert_eq!(SetupScriptMode::Manual.ui_code(), "2");
    }

    #[test]
    fn field_columns_round_trip() {
        for field in EnvironmentField::all() {
            assert_eq!(EnvironmentField::from_column(field.column()), Some(field));
        }
        assert_eq!(EnvironmentField::all().count(), 18);
        assert_eq!(EnvironmentField::from_column("id"), None);
    }

    #[test]
    fn patch_validation_checks_each_field() {
        let patch = EnvironmentPatch::new()
            .with_text(EnvironmentField::Description, "ok")
            .with_text(EnvironmentField::Version(LanguageRuntime::Node), "22")
            .with(EnvironmentField::InternetAccessEnabled, PatchValue::Flag(true));
        assert!(patch.validate().is_ok());

        let patch = EnvironmentPatch::new().with_text(EnvironmentField::ContainerImage, "alpine");
        assert!(patch.validate().is_err());

        let patch = EnvironmentPatch::new().with(EnvironmentField::Name, PatchValue::Null);
        assert_eq!(
            patch.validate().err().map(|v| v.rule()),
            Some(ViolationRule::Empty)
        );

        let patch = EnvironmentPatch::new()
            .with(EnvironmentField::ContainerCachingEnabled, PatchValue::Text("yes".into()));
        assert!(patch.validate().is_err());
    }

    #[test]
    fn automatic_mode_clears_script_in_patches() {
        let patch = EnvironmentPatch::new()
            .with_text(EnvironmentField::SetupScriptMode, "automatic")
            .with_text(EnvironmentField::SetupScript, "echo hi")
            .with_setup_script_rule();
        assert_eq!(
            patch.get(EnvironmentField::SetupScript),
            Some(&PatchValue::Null)
        );
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn manual_mode_patch_requires_script() {
        let patch = EnvironmentPatch::new().with_text(EnvironmentField::SetupScriptMode, "manual");
        let violation = patch.validate().err();
        assert_eq!(
            violation.as_ref().map(FieldViolation::message),
            Some(SETUP_SCRIPT_REQUIRED_MESSAGE)
        );

        let patch = patch.with_text(EnvironmentField::SetupScript, "./setup.sh");
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn script_without_mode_is_rejected() {
        let patch = EnvironmentPatch::new().with_text(EnvironmentField::SetupScript, "./setup.sh");
        assert!(patch.validate().is_err());
    }
}
