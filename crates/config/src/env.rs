//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict: a variable that is present must carry a valid
//! value. Secret values never appear in error metadata.

use crate::schema::{AppConfig, LogFormat, LogLevelSetting, ValidatedAppConfig};
use codex_env_shared::{ErrorCode, ErrorEnvelope, REDACTED_VALUE, SecretString, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Env var: backend project URL.
pub const ENV_STORE_URL: &str = "CODEX_ENV_STORE_URL";
/// Env var: backend project URL (alias).
pub const ENV_STORE_URL_ALIAS: &str = "SUPABASE_URL";
/// Env var: backend project URL (browser-bundle alias).
pub const ENV_STORE_URL_PUBLIC_ALIAS: &str = "NEXT_PUBLIC_SUPABASE_URL";
/// Env var: backend anon key (secret).
pub const ENV_STORE_ANON_KEY: &str = "CODEX_ENV_STORE_ANON_KEY";
/// Env var: backend anon key (alias).
pub const ENV_STORE_ANON_KEY_ALIAS: &str = "SUPABASE_ANON_KEY";
/// Env var: backend anon key (browser-bundle alias).
pub const ENV_STORE_ANON_KEY_PUBLIC_ALIAS: &str = "NEXT_PUBLIC_SUPABASE_ANON_KEY";
/// Env var: user session token (secret).
pub const ENV_STORE_ACCESS_TOKEN: &str = "CODEX_ENV_STORE_ACCESS_TOKEN";
/// Env var: backend schema.
pub const ENV_STORE_SCHEMA: &str = "CODEX_ENV_STORE_SCHEMA";
/// Env var: per-request timeout in milliseconds.
pub const ENV_STORE_TIMEOUT_MS: &str = "CODEX_ENV_STORE_TIMEOUT_MS";
/// Env var: minimum log level.
pub const ENV_LOG_LEVEL: &str = "CODEX_ENV_LOG_LEVEL";
/// Env var: log output format.
pub const ENV_LOG_FORMAT: &str = "CODEX_ENV_LOG_FORMAT";

const STORE_URL_VARS: [&str; 3] = [ENV_STORE_URL, ENV_STORE_URL_ALIAS, ENV_STORE_URL_PUBLIC_ALIAS];
const STORE_ANON_KEY_VARS: [&str; 3] = [
    ENV_STORE_ANON_KEY,
    ENV_STORE_ANON_KEY_ALIAS,
    ENV_STORE_ANON_KEY_PUBLIC_ALIAS,
];

/// Typed env-derived overrides for [`AppConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppEnv {
    /// Override for `store.baseUrl`.
    pub store_url: Option<Box<str>>,
    /// Override for `store.anonKey`.
    pub store_anon_key: Option<SecretString>,
    /// Override for `store.accessToken`.
    pub store_access_token: Option<SecretString>,
    /// Override for `store.schema`.
    pub store_schema: Option<Box<str>>,
    /// Override for `store.timeoutMs`.
    pub store_timeout_ms: Option<u64>,
    /// Override for `logging.level`.
    pub log_level: Option<LogLevelSetting>,
    /// Override for `logging.format`.
    pub log_format: Option<LogFormat>,
}

impl AppEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            store_url: parse_optional_url_string_any(map, &STORE_URL_VARS)?,
            store_anon_key: parse_optional_secret_any(map, &STORE_ANON_KEY_VARS)?,
            store_access_token: parse_optional_secret(map, ENV_STORE_ACCESS_TOKEN)?,
            store_schema: parse_optional_trimmed_string(map, ENV_STORE_SCHEMA)?,
            store_timeout_ms: parse_optional_u64(map, ENV_STORE_TIMEOUT_MS)?,
            log_level: parse_optional_enum(map, ENV_LOG_LEVEL, LogLevelSetting::parse)?,
            log_format: parse_optional_enum(map, ENV_LOG_FORMAT, LogFormat::parse)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in STORE_URL_VARS.into_iter().chain(STORE_ANON_KEY_VARS).chain([
            ENV_STORE_ACCESS_TOKEN,
            ENV_STORE_SCHEMA,
            ENV_STORE_TIMEOUT_MS,
            ENV_LOG_LEVEL,
            ENV_LOG_FORMAT,
        ]) {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: AppConfig,
    env: &AppEnv,
) -> Result<ValidatedAppConfig, ErrorEnvelope> {
    let mut config = base;

    if let Some(url) = env.store_url.as_ref() {
        config.store.base_url = Some(url.clone());
    }
    if let Some(key) = env.store_anon_key.as_ref() {
        config.store.anon_key = Some(key.clone());
    }
    if let Some(token) = env.store_access_token.as_ref() {
        config.store.access_token = Some(token.clone());
    }
    if let Some(schema) = env.store_schema.as_ref() {
        config.store.schema = schema.clone();
    }
    if let Some(timeout_ms) = env.store_timeout_ms {
        config.store.timeout_ms = timeout_ms;
    }
    if let Some(level) = env.log_level {
        config.logging.level = level;
    }
    if let Some(format) = env.log_format {
        config.logging.format = format;
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// URL env var had an invalid value.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be a valid URL"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope.with_metadata("env_var", var)
            },
            EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_value(var, &value)),
        }
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.into()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed.to_owned())))
}

fn parse_optional_secret_any(
    map: &BTreeMap<String, String>,
    vars: &[&'static str],
) -> Result<Option<SecretString>, EnvParseError> {
    for var in vars {
        if map.contains_key(*var) {
            return parse_optional_secret(map, var);
        }
    }
    Ok(None)
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_enum<T>(
    map: &BTreeMap<String, String>,
    var: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    parse(raw).map(Some).ok_or_else(|| EnvParseError::InvalidEnum {
        var,
        value: raw.clone(),
    })
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    let parsed = Url::parse(trimmed).map_err(|_| EnvParseError::InvalidUrl {
        var,
        value: raw.clone(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(EnvParseError::InvalidUrl {
            var,
            value: raw.clone(),
        });
    }

    Ok(Some(parsed.to_string().into_boxed_str()))
}

fn parse_optional_url_string_any(
    map: &BTreeMap<String, String>,
    vars: &[&'static str],
) -> Result<Option<Box<str>>, EnvParseError> {
    for var in vars {
        if map.contains_key(*var) {
            return parse_optional_url_string(map, var);
        }
    }
    Ok(None)
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED_VALUE.to_string()
    } else {
        value.to_string()
    }
}
