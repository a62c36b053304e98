//! Composition root: config in, ready gateway and submit boundary out.

use crate::logging::build_logger;
use crate::store_factory::build_store_port;
use crate::InfraResult;
use codex_env_adapters::LoggingNotifier;
use codex_env_app::{EnvironmentGateway, EnvironmentGatewayDeps, SubmitBoundary};
use codex_env_config::{AppEnv, ValidatedAppConfig, load_app_config_from_path};
use codex_env_ports::{LogFields, LoggerPort, NotifierPort};
use codex_env_shared::ErrorEnvelope;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Everything a host needs to drive the environment screens.
pub struct EnvironmentRuntime {
    /// Discriminated-result gateway.
    pub gateway: EnvironmentGateway,
    /// Submit boundary sharing the gateway's dependencies.
    pub submit: SubmitBoundary,
    /// Root logger.
    pub logger: Arc<dyn LoggerPort>,
}

/// Wire the store, logger and notifier selected by `config`.
pub fn build_runtime(config: &ValidatedAppConfig) -> InfraResult<EnvironmentRuntime> {
    let logger = build_logger(config.logging);
    let store = build_store_port(config)?;
    let notifier: Arc<dyn NotifierPort> = Arc::new(LoggingNotifier::new(Arc::clone(&logger)));

    let mut base = LogFields::new();
    base.insert("component".into(), Value::from("environments"));
    let gateway_logger: Arc<dyn LoggerPort> = Arc::from(logger.child(base));

    let deps = EnvironmentGatewayDeps {
        store,
        logger: Some(gateway_logger),
    };
    logger.info(
        "runtime.ready",
        "Environment runtime initialized",
        Some(BTreeMap::from([(
            "logFormat".into(),
            Value::from(config.logging.format.as_str()),
        )])),
    );
    Ok(EnvironmentRuntime {
        gateway: EnvironmentGateway::new(deps.clone()),
        submit: SubmitBoundary::new(deps, notifier),
        logger,
    })
}

/// Load config from an env map, an optional file and optional overrides, then wire.
pub fn build_runtime_from_sources(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<EnvironmentRuntime> {
    let env = AppEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let config = load_app_config_from_path(config_path, overrides_json, &env)?;
    build_runtime(&config)
}
