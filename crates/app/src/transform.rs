//! Transform stage: form snapshot to persistence shape.
//!
//! - `to_new_environment`: add flow, full normalization and validation
//! - `to_update_patch`: single edit, every column rewritten
//! - `to_bulk_patch` + `strip_untouched`: bulk edit, touched and non-blank
//!   columns only

use crate::form_state::FormSnapshot;
use codex_env_domain::{
    EnvironmentField, EnvironmentPatch, FieldViolation, LanguageRuntime, NewEnvironment,
    PatchValue, SetupScript, SetupScriptMode, VariableRow, VersionPins, normalize_variables,
};
use codex_env_shared::Validate;

/// Normalize a snapshot into a validated insert shape.
///
/// Reports the first violated rule: variable rows first, then the
/// environment-level rules.
pub fn to_new_environment(snapshot: &FormSnapshot) -> Result<NewEnvironment, FieldViolation> {
    let variables = normalize_variables(&snapshot.variables, &snapshot.secrets)?;
    let setup = match SetupScriptMode::from_ui_code(&snapshot.setup_script_mode) {
        SetupScriptMode::Manual => SetupScript::Manual {
            script: snapshot.setup_script.trim().into(),
        },
        SetupScriptMode::Automatic => SetupScript::Automatic,
    };

    let environment = NewEnvironment {
        name: snapshot.name.trim().into(),
        description: non_blank(&snapshot.description),
        github_org: non_blank(&snapshot.github_org),
        github_repo: non_blank(&snapshot.github_repo),
        container_image: snapshot.container_image,
        versions: effective_pins(&snapshot.versions),
        setup,
        container_caching_enabled: snapshot.container_caching_enabled,
        internet_access_enabled: snapshot.internet_access_enabled,
        variables,
    };
    environment.validate()?;
    Ok(environment)
}

/// Normalize a snapshot into a patch that rewrites every column.
///
/// Variable rows are validated but not part of the patch; edits do not
/// re-synchronize them.
pub fn to_update_patch(snapshot: &FormSnapshot) -> Result<EnvironmentPatch, FieldViolation> {
    to_new_environment(snapshot).map(|environment| patch_from_new_environment(&environment))
}

/// Every column of `environment` as a patch.
#[must_use]
pub fn patch_from_new_environment(environment: &NewEnvironment) -> EnvironmentPatch {
    let mut patch = EnvironmentPatch::new()
        .with_text(EnvironmentField::Name, environment.name.clone())
        .with(EnvironmentField::Description, nullable(environment.description.as_deref()))
        .with(EnvironmentField::GithubOrg, nullable(environment.github_org.as_deref()))
        .with(EnvironmentField::GithubRepo, nullable(environment.github_repo.as_deref()))
        .with_text(EnvironmentField::ContainerImage, environment.container_image.as_str())
        .with_text(EnvironmentField::SetupScriptMode, environment.setup.mode().as_str())
        .with(EnvironmentField::SetupScript, nullable(environment.setup.script()))
        .with(
            EnvironmentField::ContainerCachingEnabled,
            PatchValue::Flag(environment.container_caching_enabled),
        )
        .with(
            EnvironmentField::InternetAccessEnabled,
            PatchValue::Flag(environment.internet_access_enabled),
        );
    for (runtime, version) in environment.versions.iter() {
        patch.set(EnvironmentField::Version(runtime), PatchValue::Text(version.into()));
    }
    patch
}

/// Patch holding the touched columns of a bulk-edit snapshot, values as typed
/// (trimmed). Blank values survive here and are dropped by [`strip_untouched`].
#[must_use]
pub fn to_bulk_patch(snapshot: &FormSnapshot) -> EnvironmentPatch {
    let mut patch = EnvironmentPatch::new();
    for field in snapshot.touched.iter().copied() {
        let value = match field {
            EnvironmentField::Name => text(&snapshot.name),
            EnvironmentField::Description => text(&snapshot.description),
            EnvironmentField::GithubOrg => text(&snapshot.github_org),
            EnvironmentField::GithubRepo => text(&snapshot.github_repo),
            EnvironmentField::ContainerImage => text(snapshot.container_image.as_str()),
            EnvironmentField::Version(runtime) => text(snapshot.versions.get(runtime)),
            EnvironmentField::SetupScriptMode => {
                text(SetupScriptMode::from_ui_code(&snapshot.setup_script_mode).as_str())
            },
            EnvironmentField::SetupScript => text(&snapshot.setup_script),
            EnvironmentField::ContainerCachingEnabled => {
                PatchValue::Flag(snapshot.container_caching_enabled)
            },
            EnvironmentField::InternetAccessEnabled => {
                PatchValue::Flag(snapshot.internet_access_enabled)
            },
        };
        patch.set(field, value);
    }
    patch
}

/// Drop every null or empty-after-trim value, so only explicit edits remain.
#[must_use]
pub fn strip_untouched(mut patch: EnvironmentPatch) -> EnvironmentPatch {
    patch.retain(|_, value| !value.is_blank());
    patch
}

impl From<&NewEnvironment> for FormSnapshot {
    fn from(environment: &NewEnvironment) -> Self {
        let (secrets, variables): (Vec<_>, Vec<_>) = environment
            .variables
            .iter()
            .partition(|variable| variable.is_secret());
        let rows = |list: Vec<&codex_env_domain::EnvironmentVariable>| -> Vec<VariableRow> {
            list.into_iter()
                .map(|variable| VariableRow::new(variable.name().as_str(), variable.value().expose()))
                .collect()
        };
        Self {
            name: environment.name.to_string(),
            description: environment.description.as_deref().unwrap_or_default().to_string(),
            github_org: environment.github_org.as_deref().unwrap_or_default().to_string(),
            github_repo: environment.github_repo.as_deref().unwrap_or_default().to_string(),
            container_image: environment.container_image,
            versions: environment.versions.clone(),
            setup_script_mode: environment.setup.mode().ui_code().to_string(),
            setup_script: environment.setup.script().unwrap_or_default().to_string(),
            container_caching_enabled: environment.container_caching_enabled,
            internet_access_enabled: environment.internet_access_enabled,
            variables: rows(variables),
            secrets: rows(secrets),
            touched: std::collections::BTreeSet::new(),
        }
    }
}

fn effective_pins(pins: &VersionPins) -> VersionPins {
    LanguageRuntime::ALL
        .into_iter()
        .fold(VersionPins::default(), |effective, runtime| {
            let version = pins.get(runtime).trim();
            if version.is_empty() {
                effective.with(runtime, runtime.default_version())
            } else {
                effective.with(runtime, version)
            }
        })
}

fn non_blank(value: &str) -> Option<Box<str>> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.into())
}

fn nullable(value: Option<&str>) -> PatchValue {
    value.map_or(PatchValue::Null, |text| PatchValue::Text(text.into()))
}

fn text(value: &str) -> PatchValue {
    PatchValue::Text(value.trim().into())
}
