//! Environment store adapter construction.

use crate::InfraResult;
use codex_env_adapters::{PostgrestEnvironmentStore, PostgrestStoreConfig};
use codex_env_config::ValidatedAppConfig;
use codex_env_ports::EnvironmentStorePort;
use codex_env_shared::ErrorEnvelope;
use std::sync::Arc;

/// Build the backend store from config.
///
/// Fails with `config:missing_value` when the base URL or anon key is unset.
pub fn build_store_port(config: &ValidatedAppConfig) -> InfraResult<Arc<dyn EnvironmentStorePort>> {
    let endpoint = config.store_endpoint().map_err(ErrorEnvelope::from)?;
    let adapter = PostgrestEnvironmentStore::new(PostgrestStoreConfig::from(endpoint))?;
    Ok(Arc::new(adapter))
}
