//! Config loading helpers (env + file + overrides).
//!
//! The loader owns the merge order and surfaces user-facing errors as typed
//! `ErrorEnvelope`s.

use crate::{AppConfig, AppEnv, LogFormat, LogLevelSetting, ValidatedAppConfig, apply_env_overrides};
use codex_env_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the app config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`AppEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`AppConfig::default()`)
pub fn load_app_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &AppEnv,
) -> Result<ValidatedAppConfig, ErrorEnvelope> {
    let mut config = match config_json {
        None => AppConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, &overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the app config from an optional file path (`.json` or `.toml`).
pub fn load_app_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &AppEnv,
) -> Result<ValidatedAppConfig, ErrorEnvelope> {
    let mut config = match config_path {
        None => AppConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, &overrides);
    }

    apply_env_overrides(config, env)
}

/// Load the app config from std env and an optional file path.
pub fn load_app_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedAppConfig, ErrorEnvelope> {
    let env = AppEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_app_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
///
/// Credentials are never part of the output.
pub fn to_pretty_json(config: &AppConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &AppConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(input: &str, format: ConfigFormat) -> Result<AppConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<AppConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct AppConfigOverrides {
    version: Option<u32>,
    store: StoreConfigOverrides,
    logging: LoggingConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct StoreConfigOverrides {
    base_url: Option<Box<str>>,
    schema: Option<Box<str>>,
    environments_table: Option<Box<str>>,
    variables_table: Option<Box<str>>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct LoggingConfigOverrides {
    level: Option<LogLevelSetting>,
    format: Option<LogFormat>,
}

fn apply_overrides(config: &mut AppConfig, overrides: &AppConfigOverrides) {
    OverrideMapper::set(&mut config.version, overrides.version);

    let store = &overrides.store;
    if let Some(base_url) = store.base_url.as_deref() {
        config.store.base_url = Some(base_url.into());
    }
    OverrideMapper::set_clone(&mut config.store.schema, store.schema.as_ref());
    OverrideMapper::set_clone(
        &mut config.store.environments_table,
        store.environments_table.as_ref(),
    );
    OverrideMapper::set_clone(
        &mut config.store.variables_table,
        store.variables_table.as_ref(),
    );
    OverrideMapper::set(&mut config.store.timeout_ms, store.timeout_ms);

    OverrideMapper::set(&mut config.logging.level, overrides.logging.level);
    OverrideMapper::set(&mut config.logging.format, overrides.logging.format);
}

struct OverrideMapper;

impl OverrideMapper {
    fn set<T>(field: &mut T, value: Option<T>) {
        if let Some(value) = value {
            *field = value;
        }
    }

    fn set_clone<T: Clone>(field: &mut T, value: Option<&T>) {
        if let Some(value) = value {
            *field = value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn override_precedence_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "store": { "timeoutMs": 10000, "schema": "from_file" } }"#;
        let overrides_json = r#"{ "store": { "timeoutMs": 20000 } }"#;
        let mut map = BTreeMap::new();
        map.insert(
            crate::env::ENV_STORE_TIMEOUT_MS.to_string(),
            "40000".to_string(),
        );
        let env = AppEnv::from_map(&map)?;

        let config = load_app_config_from_sources(Some(config_json), Some(overrides_json), &env)?;
        assert_eq!(config.store.timeout_ms, 40_000);
        assert_eq!(&*config.store.schema, "from_file");
        Ok(())
    }

    #[test]
    fn serialization_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config = AppConfig::default();
        let first = to_pretty_json(&config)?;
        let second = to_pretty_json(&config)?;
        assert_eq!(first, second);
        assert!(first.ends_with('\n'));

        let toml = to_pretty_toml(&config)?;
        assert!(toml.contains("timeoutMs = 30000"));
        Ok(())
    }

    #[test]
    fn invalid_config_value_overridden_by_valid_env_succeeds()
    -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "store": { "timeoutMs": 5 } }"#;
        let mut map = BTreeMap::new();
        map.insert(
            crate::env::ENV_STORE_TIMEOUT_MS.to_string(),
            "15000".to_string(),
        );
        let env = AppEnv::from_map(&map)?;

        let config = load_app_config_from_sources(Some(config_json), None, &env)?;
        assert_eq!(config.store.timeout_ms, 15_000);
        Ok(())
    }

    #[test]
    fn overrides_reject_unknown_fields() {
        let error = load_app_config_from_sources(
            None,
            Some(r#"{ "store": { "anonKey": "nope" } }"#),
            &AppEnv::default(),
        )
        .err();
        assert_eq!(
            error.as_ref().map(|error| error.code.clone()),
            Some(ErrorCode::new("config", "invalid_json"))
        );
        assert_eq!(
            error
                .as_ref()
                .and_then(|error| error.metadata.get("source"))
                .map(String::as_str),
            Some("overrides")
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let error = detect_config_format(Path::new("config.yaml")).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "unsupported_format"))
        );
    }
}
