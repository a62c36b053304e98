//! API v1 DTO mapping helpers.

use crate::v1::{
    CreateEnvironmentRequestDto, EnvironmentInsertDto, EnvironmentRowDto,
    EnvironmentVariableInsertDto, GatewayErrorMeta, GatewayResultDto, UpdateEnvironmentRequestDto,
    VersionColumnsDto,
};
use codex_env_domain::validation::parse_container_image;
use codex_env_domain::{
    ContainerImage, EnvironmentField, EnvironmentId, EnvironmentPatch, EnvironmentRecord,
    EnvironmentVariable, FieldViolation, LanguageRuntime, NewEnvironment, PatchValue, SetupScript,
    SetupScriptMode, VariableRow, VersionPins, normalize_tagged_variables,
};
use codex_env_shared::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, redact_if_secret};
use serde_json::{Map, Value};

/// Message returned in place of an unexpected failure's own message.
pub const GATEWAY_UNEXPECTED_MESSAGE: &str = "An unexpected error occurred";

/// Message a gateway failure shows the caller.
///
/// Unexpected errors are replaced by a generic message; expected and
/// invariant errors keep their own.
#[must_use]
pub fn gateway_failure_message(error: &ErrorEnvelope) -> &str {
    match error.kind {
        ErrorKind::Unexpected => GATEWAY_UNEXPECTED_MESSAGE,
        ErrorKind::Expected | ErrorKind::Invariant => &error.message,
    }
}

/// Map a shared result into the gateway result wrapper.
#[must_use]
pub fn result_to_gateway_result<T>(result: Result<T, ErrorEnvelope>) -> GatewayResultDto<T> {
    match result {
        Ok(data) => GatewayResultDto::success(data),
        Err(error) => {
            let meta: GatewayErrorMeta = error
                .metadata
                .iter()
                .map(|(key, value)| (key.clone(), redact_if_secret(key, value)))
                .collect();
            GatewayResultDto::Failure {
                success: false,
                error: gateway_failure_message(&error).to_string(),
                code: error.code.to_string(),
                meta: (!meta.is_empty()).then_some(meta),
            }
        },
    }
}

/// All nine pins, defaults included, as column values.
#[must_use]
pub fn version_columns_from_pins(pins: &VersionPins) -> VersionColumnsDto {
    let mut columns = VersionColumnsDto::default();
    for (runtime, version) in pins.iter() {
        columns.set(runtime, version);
    }
    columns
}

/// Pins from column values; missing or empty columns read as the default.
#[must_use]
pub fn pins_from_columns(columns: &VersionColumnsDto) -> VersionPins {
    let mut pins = VersionPins::default();
    for runtime in LanguageRuntime::ALL {
        if let Some(version) = non_blank(columns.get(runtime)) {
            pins.set(runtime, version.trim());
        }
    }
    pins
}

/// Normalize a create request into the insert shape.
///
/// Applies the variable-row rules and substitutes defaults for every missing
/// or empty field. The result still has to pass `NewEnvironment::validate`.
pub fn new_environment_from_create_request(
    dto: &CreateEnvironmentRequestDto,
) -> Result<NewEnvironment, FieldViolation> {
    let rows: Vec<(VariableRow, bool)> = dto
        .environment_variables
        .iter()
        .flatten()
        .map(|variable| {
            (
                VariableRow::new(variable.name.as_str(), variable.value.as_str()),
                variable.is_secret,
            )
        })
        .collect();
    let variables = normalize_tagged_variables(rows.iter().map(|(row, secret)| (row, *secret)))?;

    let container_image = match non_blank(dto.container_image.as_deref()) {
        Some(image) => parse_container_image(image)?,
        None => ContainerImage::default(),
    };
    let manual = dto
        .setup_script_mode
        .as_deref()
        .and_then(|mode| SetupScriptMode::parse(mode.trim()))
        == Some(SetupScriptMode::Manual);
    let setup = if manual {
        SetupScript::Manual {
            script: dto.setup_script.as_deref().unwrap_or_default().trim().into(),
        }
    } else {
        SetupScript::Automatic
    };

    Ok(NewEnvironment {
        name: dto.name.trim().into(),
        description: non_blank(dto.description.as_deref()).map(|text| text.trim().into()),
        github_org: non_empty(dto.github_org.as_deref()),
        github_repo: non_empty(dto.github_repo.as_deref()),
        container_image,
        versions: pins_from_columns(&dto.versions),
        setup,
        container_caching_enabled: dto.container_caching_enabled.unwrap_or(false),
        internet_access_enabled: dto.internet_access_enabled.unwrap_or(false),
        variables,
    })
}

/// Translate an update request into a patch, field for field.
///
/// No stripping happens here: an empty string stays an empty string.
#[must_use]
pub fn patch_from_update_request(dto: &UpdateEnvironmentRequestDto) -> EnvironmentPatch {
    let mut patch = EnvironmentPatch::new();
    set_text(&mut patch, EnvironmentField::Name, dto.name.as_deref());
    set_nullable(&mut patch, EnvironmentField::Description, dto.description.as_ref());
    set_nullable(&mut patch, EnvironmentField::GithubOrg, dto.github_org.as_ref());
    set_nullable(&mut patch, EnvironmentField::GithubRepo, dto.github_repo.as_ref());
    set_text(
        &mut patch,
        EnvironmentField::ContainerImage,
        dto.container_image.as_deref(),
    );
    for runtime in LanguageRuntime::ALL {
        set_text(
            &mut patch,
            EnvironmentField::Version(runtime),
            dto.versions.get(runtime),
        );
    }
    set_text(
        &mut patch,
        EnvironmentField::SetupScriptMode,
        dto.setup_script_mode.as_deref(),
    );
    set_nullable(&mut patch, EnvironmentField::SetupScript, dto.setup_script.as_ref());
    if let Some(flag) = dto.container_caching_enabled {
        patch.set(EnvironmentField::ContainerCachingEnabled, PatchValue::Flag(flag));
    }
    if let Some(flag) = dto.internet_access_enabled {
        patch.set(EnvironmentField::InternetAccessEnabled, PatchValue::Flag(flag));
    }
    patch
}

/// JSON body for an `environments` update.
#[must_use]
pub fn patch_body(patch: &EnvironmentPatch) -> Map<String, Value> {
    patch
        .iter()
        .map(|(field, value)| {
            let value = match value {
                PatchValue::Null => Value::Null,
                PatchValue::Text(text) => Value::String(text.to_string()),
                PatchValue::Flag(flag) => Value::Bool(*flag),
            };
            (field.column().to_string(), value)
        })
        .collect()
}

/// Body of the `environments` insert for a new environment.
#[must_use]
pub fn environment_insert_from_new(environment: &NewEnvironment) -> EnvironmentInsertDto {
    EnvironmentInsertDto {
        name: environment.name.to_string(),
        description: environment.description.as_deref().map(str::to_string),
        github_org: environment.github_org.as_deref().map(str::to_string),
        github_repo: environment.github_repo.as_deref().map(str::to_string),
        container_image: environment.container_image.as_str().to_string(),
        versions: version_columns_from_pins(&environment.versions),
        setup_script_mode: environment.setup.mode().as_str().to_string(),
        setup_script: environment.setup.script().map(str::to_string),
        container_caching_enabled: environment.container_caching_enabled,
        internet_access_enabled: environment.internet_access_enabled,
    }
}

/// Body rows of the `environment_variables` insert.
#[must_use]
pub fn variable_inserts(
    environment_id: &EnvironmentId,
    variables: &[EnvironmentVariable],
) -> Vec<EnvironmentVariableInsertDto> {
    variables
        .iter()
        .map(|variable| EnvironmentVariableInsertDto {
            environment_id: environment_id.as_str().to_string(),
            name: variable.name().as_str().to_string(),
            value: variable.value().clone(),
            is_secret: variable.is_secret(),
        })
        .collect()
}

/// Decode a backend row.
pub fn record_from_row(row: EnvironmentRowDto) -> Result<EnvironmentRecord, ErrorEnvelope> {
    let id = EnvironmentId::parse(&row.id)
        .map_err(|_| invalid_row("environment row has an empty id", "id", &row.id))?;
    let container_image = ContainerImage::parse(&row.container_image).ok_or_else(|| {
        invalid_row(
            "environment row has an unknown container image",
            "container_image",
            &row.container_image,
        )
    })?;
    let setup_script_mode = SetupScriptMode::parse(&row.setup_script_mode).ok_or_else(|| {
        invalid_row(
            "environment row has an unknown setup script mode",
            "setup_script_mode",
            &row.setup_script_mode,
        )
    })?;

    Ok(EnvironmentRecord {
        id,
        versions: pins_from_columns(&row.versions),
        name: row.name.into(),
        description: row.description.map(Into::into),
        github_org: row.github_org.map(Into::into),
        github_repo: row.github_repo.map(Into::into),
        container_image,
        setup_script_mode,
        setup_script: row.setup_script.map(Into::into),
        container_caching_enabled: row.container_caching_enabled,
        internet_access_enabled: row.internet_access_enabled,
        created_at: row.created_at.map(Into::into),
        updated_at: row.updated_at.map(Into::into),
        created_by: row.created_by.map(Into::into),
    })
}

/// Encode a record as a backend row.
#[must_use]
pub fn row_from_record(record: &EnvironmentRecord) -> EnvironmentRowDto {
    let text = |value: &Option<Box<str>>| value.as_deref().map(str::to_string);
    EnvironmentRowDto {
        id: record.id.as_str().to_string(),
        name: record.name.to_string(),
        description: text(&record.description),
        github_org: text(&record.github_org),
        github_repo: text(&record.github_repo),
        container_image: record.container_image.as_str().to_string(),
        versions: version_columns_from_pins(&record.versions),
        setup_script_mode: record.setup_script_mode.as_str().to_string(),
        setup_script: text(&record.setup_script),
        container_caching_enabled: record.container_caching_enabled,
        internet_access_enabled: record.internet_access_enabled,
        created_at: text(&record.created_at),
        updated_at: text(&record.updated_at),
        created_by: text(&record.created_by),
    }
}

fn invalid_row(message: &str, column: &str, value: &str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::store_invalid_response(),
        message,
        ErrorClass::NonRetriable,
    )
    .with_metadata("column", column)
    .with_metadata("value", value)
}

fn set_text(patch: &mut EnvironmentPatch, field: EnvironmentField, value: Option<&str>) {
    if let Some(value) = value {
        patch.set(field, PatchValue::Text(value.into()));
    }
}

fn set_nullable(patch: &mut EnvironmentPatch, field: EnvironmentField, value: Option<&Option<String>>) {
    match value {
        Some(Some(text)) => patch.set(field, PatchValue::Text(text.as_str().into())),
        Some(None) => patch.set(field, PatchValue::Null),
        None => {},
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

fn non_empty(value: Option<&str>) -> Option<Box<str>> {
    value.filter(|text| !text.is_empty()).map(Into::into)
}
