//! # codex-env-config
//!
//! Configuration schema, env parsing, and loading for the environments
//! service. This crate depends on `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    AppConfig, CURRENT_CONFIG_VERSION, ConfigSchemaError, DEFAULT_ENVIRONMENTS_TABLE,
    DEFAULT_STORE_SCHEMA, DEFAULT_VARIABLES_TABLE, LogFormat, LogLevelSetting, LoggingConfig,
    StoreConfig, StoreEndpoint, ValidatedAppConfig, app_config_schema, parse_app_config_json,
    parse_app_config_toml,
};

pub use env::{AppEnv, EnvParseError, apply_env_overrides};
pub use load::{
    load_app_config_from_path, load_app_config_from_sources, load_app_config_std_env,
    to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
