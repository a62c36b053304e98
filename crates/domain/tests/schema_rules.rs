//! Integration coverage for the environment schema.

use codex_env_domain::{
    ContainerImage, EnvironmentField, EnvironmentPatch, FieldViolation, LanguageRuntime,
    NewEnvironment, PatchValue, SETUP_SCRIPT_REQUIRED_MESSAGE, SetupScript, SetupScriptMode,
    VariableRow, ViolationRule, normalize_variables,
};
use codex_env_shared::{ErrorCode, ErrorEnvelope, ErrorKind, Validate};

fn with_variables(rows: &[(&str, &str)]) -> Result<NewEnvironment, FieldViolation> {
    let variables: Vec<VariableRow> = rows
        .iter()
        .map(|(key, value)| VariableRow::new(*key, *value))
        .collect();
    Ok(NewEnvironment {
        name: "ci-env".into(),
        variables: normalize_variables(&variables, &[])?,
        ..NewEnvironment::default()
    })
}

#[test]
fn incomplete_row_surfaces_as_expected_validation_error() {
    let Err(violation) = with_variables(&[("a", "")]) else {
        return;
    };
    let envelope: ErrorEnvelope = violation.into();

    assert_eq!(envelope.kind, ErrorKind::Expected);
    assert_eq!(envelope.code, ErrorCode::variable_incomplete());
    assert_eq!(
        envelope.message,
        "Environment variables and secrets require both a key and value."
    );
    assert_eq!(
        envelope.metadata.get("field").map(String::as_str),
        Some("environment_variables")
    );
}

#[test]
fn case_insensitive_duplicate_names_the_uppercased_key() {
    let violation = with_variables(&[("a", "1"), ("A", "2")]).err();
    assert_eq!(
        violation.as_ref().map(FieldViolation::message),
        Some("Duplicate key \"A\" detected.")
    );
}

#[test]
fn normalized_environment_passes_schema() -> Result<(), FieldViolation> {
    let environment = NewEnvironment {
        container_image: ContainerImage::Python,
        setup: SetupScript::Manual {
            script: "pip install -r requirements.txt".into(),
        },
        ..with_variables(&[("api_key", "abc")])?
    };
    environment.validate()?;

    assert_eq!(environment.versions.get(LanguageRuntime::Python), "3.12");
    assert_eq!(environment.setup.script(), Some("pip install -r requirements.txt"));
    Ok(())
}

#[test]
fn patch_with_malformed_version_is_rejected_before_any_write() {
    let patch = EnvironmentPatch::new()
        .with_text(EnvironmentField::Version(LanguageRuntime::Rust), "1.89")
        .with(EnvironmentField::ContainerCachingEnabled, PatchValue::Flag(true));
    let violation = patch.validate().err();

    assert_eq!(
        violation.as_ref().map(FieldViolation::field),
        Some("rust_version")
    );
    assert_eq!(violation.map(|v| v.rule()), Some(ViolationRule::Invalid));
}

#[test]
fn every_pin_is_checked_after_a_padded_one() {
    let mut environment = NewEnvironment {
        name: "ci-env".into(),
        ..NewEnvironment::default()
    };
    environment.versions.set(LanguageRuntime::Node, " 20");
    environment.versions.set(LanguageRuntime::Go, "not-a-version");

    let violation = environment.validate().err();

    assert_eq!(environment.versions.get(LanguageRuntime::Node), "20");
    assert_eq!(
        violation.as_ref().map(FieldViolation::field),
        Some("go_version")
    );
}

#[test]
fn patch_text_is_trimmed_before_the_setup_rule() {
    let patch = EnvironmentPatch::new()
        .with_text(EnvironmentField::Version(LanguageRuntime::Node), " 20 ")
        .with_text(EnvironmentField::SetupScriptMode, " manual");

    assert_eq!(patch.setup_script_mode(), Some(SetupScriptMode::Manual));
    assert_eq!(
        patch
            .get(EnvironmentField::Version(LanguageRuntime::Node))
            .and_then(PatchValue::as_text),
        Some("20")
    );
    let violation = patch.validate().err();
    assert_eq!(
        violation.as_ref().map(FieldViolation::message),
        Some(SETUP_SCRIPT_REQUIRED_MESSAGE)
    );
}

#[test]
fn variable_values_are_stored_trimmed() -> Result<(), FieldViolation> {
    let environment = with_variables(&[("api_key", "  abc  ")])?;
    let value = environment.variables.first().map(|v| v.value().expose());
    assert_eq!(value, Some("abc"));
    Ok(())
}
