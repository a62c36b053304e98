//! Effective config rendering for host surfaces.

use crate::InfraResult;
use codex_env_config::{AppEnv, load_app_config_from_path, to_pretty_json};
use codex_env_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Load and validate the effective config, returning deterministic pretty JSON.
///
/// Credentials never appear in the output.
pub fn load_effective_config_json(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<String> {
    let env = AppEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let config = load_app_config_from_path(config_path, overrides_json, &env)?;
    to_pretty_json(&config)
}
