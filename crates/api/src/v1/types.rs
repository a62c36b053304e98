//! API v1 DTO types.
//!
//! Row and request DTOs use the backend's snake_case column names; gateway
//! result payloads use camelCase.

use codex_env_domain::LanguageRuntime;
use codex_env_shared::SecretString;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Metadata map attached to gateway failures.
pub type GatewayErrorMeta = BTreeMap<String, String>;

/// Discriminated result returned by every gateway operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GatewayResultDto<T> {
    /// The operation succeeded.
    Success {
        /// Always `true`.
        success: bool,
        /// Operation payload.
        data: T,
    },
    /// The operation failed.
    Failure {
        /// Always `false`.
        success: bool,
        /// Message shown to the user.
        error: String,
        /// Stable `namespace:code` string.
        code: String,
        /// Redacted diagnostic metadata.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<GatewayErrorMeta>,
    },
}

impl<T> GatewayResultDto<T> {
    /// Build a success result.
    #[must_use]
    pub const fn success(data: T) -> Self {
        Self::Success {
            success: true,
            data,
        }
    }

    /// Build a failure result.
    #[must_use]
    pub fn failure(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
            code: code.into(),
            meta: None,
        }
    }

    /// Returns true for the success variant.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Payload of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEnvironmentDto {
    /// Identifier of the new row.
    pub id: String,
}

/// Payload of a successful bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResultDto {
    /// Number of ids targeted.
    pub updated_count: usize,
    /// Columns actually written; empty when nothing was sent.
    pub applied_fields: Vec<String>,
}

/// Payload of a successful bulk delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResultDto {
    /// Number of ids targeted.
    pub deleted_count: usize,
}

/// The nine `<runtime>_version` columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct VersionColumnsDto {
    /// `python_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
    /// `node_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
    /// `ruby_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruby_version: Option<String>,
    /// `rust_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rust_version: Option<String>,
    /// `go_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_version: Option<String>,
    /// `bun_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bun_version: Option<String>,
    /// `php_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub php_version: Option<String>,
    /// `java_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<String>,
    /// `swift_version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swift_version: Option<String>,
}

impl VersionColumnsDto {
    /// Column value for `runtime`.
    #[must_use]
    pub fn get(&self, runtime: LanguageRuntime) -> Option<&str> {
        self.slot(runtime).as_deref()
    }

    /// Set the column for `runtime`.
    pub fn set(&mut self, runtime: LanguageRuntime, version: impl Into<String>) {
        *self.slot_mut(runtime) = Some(version.into());
    }

    const fn slot(&self, runtime: LanguageRuntime) -> &Option<String> {
        match runtime {
            LanguageRuntime::Python => &self.python_version,
            LanguageRuntime::Node => &self.node_version,
            LanguageRuntime::Ruby => &self.ruby_version,
            LanguageRuntime::Rust => &self.rust_version,
            LanguageRuntime::Go => &self.go_version,
            LanguageRuntime::Bun => &self.bun_version,
            LanguageRuntime::Php => &self.php_version,
            LanguageRuntime::Java => &self.java_version,
            LanguageRuntime::Swift => &self.swift_version,
        }
    }

    const fn slot_mut(&mut self, runtime: LanguageRuntime) -> &mut Option<String> {
        match runtime {
            LanguageRuntime::Python => &mut self.python_version,
            LanguageRuntime::Node => &mut self.node_version,
            LanguageRuntime::Ruby => &mut self.ruby_version,
            LanguageRuntime::Rust => &mut self.rust_version,
            LanguageRuntime::Go => &mut self.go_version,
            LanguageRuntime::Bun => &mut self.bun_version,
            LanguageRuntime::Php => &mut self.php_version,
            LanguageRuntime::Java => &mut self.java_version,
            LanguageRuntime::Swift => &mut self.swift_version,
        }
    }
}

/// One variable or secret in a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnvironmentVariableDto {
    /// Key as typed; uppercased during normalization.
    pub name: String,
    /// Value as typed.
    pub value: String,
    /// Secret flag.
    #[serde(default)]
    pub is_secret: bool,
}

/// Create request payload.
///
/// Every field but `name` is optional; missing or empty values fall back to
/// the stored defaults.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    codex_env_validate_derive::Validate,
)]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct CreateEnvironmentRequestDto {
    /// Display name.
    #[validate(non_empty, max_len(100), custom = "crate::v1::validation::validate_name_charset")]
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(max_len(500))]
    pub description: Option<String>,
    /// GitHub organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_org: Option<String>,
    /// GitHub repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
    /// `universal`, `node` or `python`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
    /// Runtime version pins.
    #[serde(flatten)]
    #[validate(custom = "crate::v1::validation::validate_version_columns")]
    pub versions: VersionColumnsDto,
    /// `manual` selects manual mode; anything else is automatic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_script_mode: Option<String>,
    /// Script for manual mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_script: Option<String>,
    /// Container caching flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_caching_enabled: Option<bool>,
    /// Internet access flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet_access_enabled: Option<bool>,
    /// Variables and secrets, in submission order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<Vec<EnvironmentVariableDto>>,
}

/// Partial update payload. Absent fields are untouched; `null` clears a
/// nullable column.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    codex_env_validate_derive::Validate,
)]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct UpdateEnvironmentRequestDto {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(max_len(100))]
    pub name: Option<String>,
    /// Description.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub description: Option<Option<String>>,
    /// GitHub organization.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub github_org: Option<Option<String>>,
    /// GitHub repository.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub github_repo: Option<Option<String>>,
    /// Container image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
    /// Runtime version pins.
    #[serde(flatten)]
    pub versions: VersionColumnsDto,
    /// `automatic` or `manual`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_script_mode: Option<String>,
    /// Setup script.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub setup_script: Option<Option<String>>,
    /// Container caching flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_caching_enabled: Option<bool>,
    /// Internet access flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet_access_enabled: Option<bool>,
}

// Present-but-null must stay distinguishable from absent.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// A row of the `environments` table as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRowDto {
    /// Row identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// GitHub organization.
    #[serde(default)]
    pub github_org: Option<String>,
    /// GitHub repository.
    #[serde(default)]
    pub github_repo: Option<String>,
    /// Container image.
    pub container_image: String,
    /// Runtime version pins.
    #[serde(flatten)]
    pub versions: VersionColumnsDto,
    /// Setup mode.
    pub setup_script_mode: String,
    /// Setup script.
    #[serde(default)]
    pub setup_script: Option<String>,
    /// Container caching flag.
    #[serde(default)]
    pub container_caching_enabled: bool,
    /// Internet access flag.
    #[serde(default)]
    pub internet_access_enabled: bool,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Creator.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Body of an `environments` insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInsertDto {
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// GitHub organization.
    pub github_org: Option<String>,
    /// GitHub repository.
    pub github_repo: Option<String>,
    /// Container image.
    pub container_image: String,
    /// Runtime version pins (all nine set).
    #[serde(flatten)]
    pub versions: VersionColumnsDto,
    /// Setup mode.
    pub setup_script_mode: String,
    /// Setup script, `null` unless manual.
    pub setup_script: Option<String>,
    /// Container caching flag.
    pub container_caching_enabled: bool,
    /// Internet access flag.
    pub internet_access_enabled: bool,
}

/// Body row of an `environment_variables` insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariableInsertDto {
    /// Owning environment.
    pub environment_id: String,
    /// Uppercased name.
    pub name: String,
    /// Value; redacted in `Debug`, plain on the wire.
    pub value: SecretString,
    /// Secret flag.
    pub is_secret: bool,
}

/// `{ "id": ... }` projection returned by inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentIdDto {
    /// Row identifier.
    pub id: String,
}
