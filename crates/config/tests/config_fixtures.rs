//! Integration tests for parsing config fixtures from the workspace testkit.

use codex_env_config::{
    AppEnv, CURRENT_CONFIG_VERSION, LogFormat, LogLevelSetting, load_app_config_from_path,
    parse_app_config_json, parse_app_config_toml,
};
use codex_env_shared::ErrorCode;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn fixture_path(relative: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join("testkit")
        .join("fixtures")
        .join(relative)
}

fn read_fixture(relative: &str) -> Result<String, Box<dyn Error>> {
    Ok(fs::read_to_string(fixture_path(relative))?)
}

#[test]
fn parses_valid_fixture_and_normalizes() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/app-config.valid.json")?;
    let config = parse_app_config_json(&contents)?;

    assert_eq!(config.version, CURRENT_CONFIG_VERSION);
    assert_eq!(
        config.store.base_url.as_deref(),
        Some("https://project-ref.supabase.co"),
        "base url should be trimmed"
    );
    assert_eq!(config.store.timeout_ms, 45_000);
    assert_eq!(config.logging.level, LogLevelSetting::Debug);
    assert!(config.store.anon_key.is_none());

    Ok(())
}

#[test]
fn parses_default_toml_fixture() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/app-config.default.toml")?;
    let config = parse_app_config_toml(&contents)?;

    assert_eq!(config.store.timeout_ms, 30_000);
    assert_eq!(&*config.store.variables_table, "environment_variables");
    assert_eq!(config.logging.format, LogFormat::Tracing);

    Ok(())
}

#[test]
fn invalid_fixture_reports_error_code() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/app-config.invalid.json")?;
    let error = parse_app_config_json(&contents)
        .err()
        .ok_or_else(|| std::io::Error::other("expected invalid fixture error"))?;

    assert_eq!(error.code, ErrorCode::new("config", "invalid_timeout"));
    assert_eq!(
        error.metadata.get("section").map(String::as_str),
        Some("store")
    );
    assert_eq!(
        error.metadata.get("field").map(String::as_str),
        Some("timeoutMs")
    );

    Ok(())
}

#[test]
fn loads_toml_fixture_from_path() -> Result<(), Box<dyn Error>> {
    let path = fixture_path("config/app-config.default.toml");
    let config = load_app_config_from_path(Some(&path), None, &AppEnv::default())?;
    assert_eq!(&*config.store.schema, "codex_open");
    Ok(())
}

#[test]
fn missing_file_reports_not_found() {
    let path = fixture_path("config/does-not-exist.json");
    let error = load_app_config_from_path(Some(&path), None, &AppEnv::default()).err();
    assert_eq!(
        error.map(|error| error.code),
        Some(ErrorCode::new("config", "config_file_not_found"))
    );
}
