//! Contract-style tests for port traits using in-memory adapters.

use codex_env_domain::{
    EnvironmentField, EnvironmentId, EnvironmentPatch, EnvironmentVariable, NewEnvironment,
    PatchValue, VariableName,
};
use codex_env_ports::{EnvironmentStorePort, LoggerPort, NotifierPort};
use codex_env_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString};
use codex_env_testkit::errors::store_rejected_error;
use codex_env_testkit::in_memory::{
    InMemoryEnvironmentStore, NoopLogger, RecordingNotifier, StoreOperation,
};
use std::sync::Arc;

fn environment(name: &str) -> NewEnvironment {
    NewEnvironment {
        name: name.into(),
        ..NewEnvironment::default()
    }
}

fn variable(name: &str, value: &str) -> Result<EnvironmentVariable> {
    let name = VariableName::parse(name).map_err(ErrorEnvelope::from)?;
    Ok(EnvironmentVariable::new(name, SecretString::from(value), false))
}

#[tokio::test]
async fn store_port_contract_smoke() -> Result<()> {
    let ctx = RequestContext::new_request();
    let store: Arc<dyn EnvironmentStorePort> = Arc::new(InMemoryEnvironmentStore::new());

    let id = store.insert_environment(&ctx, environment("ci-env")).await?;
    store
        .insert_variables(&ctx, id.clone(), vec![variable("API_KEY", "abc")?])
        .await?;

    let fetched = store.get_environment(&ctx, id.clone()).await?;
    assert_eq!(fetched.as_ref().map(|row| &*row.name), Some("ci-env"));

    let patch = EnvironmentPatch::new().with_text(EnvironmentField::Description, "nightly");
    let updated = store.update_environment(&ctx, id.clone(), patch).await?;
    assert_eq!(updated.description.as_deref(), Some("nightly"));

    store.delete_environments(&ctx, vec![id.clone()]).await?;
    assert!(store.get_environment(&ctx, id).await?.is_none());
    assert!(store.list_environments(&ctx).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn bulk_update_ignores_unknown_ids() -> Result<()> {
    let ctx = RequestContext::new_request();
    let store = InMemoryEnvironmentStore::new();
    let known = store.seed(environment("one")).await?;
    let unknown = EnvironmentId::parse("nope").map_err(ErrorEnvelope::from)?;

    let patch = EnvironmentPatch::new()
        .with(EnvironmentField::ContainerCachingEnabled, PatchValue::Flag(true));
    store
        .update_environments(&ctx, vec![known.clone(), unknown], patch)
        .await?;

    let rows = store.environments().await;
    assert_eq!(rows.len(), 1);
    assert!(rows.iter().all(|row| row.container_caching_enabled));
    Ok(())
}

#[tokio::test]
async fn variables_require_an_existing_parent() -> Result<()> {
    let ctx = RequestContext::new_request();
    let store = InMemoryEnvironmentStore::new();
    let orphan = EnvironmentId::parse("orphan").map_err(ErrorEnvelope::from)?;

    let error = store
        .insert_variables(&ctx, orphan, vec![variable("TOKEN", "x")?])
        .await
        .err();
    assert_eq!(error.map(|error| error.code), Some(ErrorCode::store_rejected()));
    Ok(())
}

#[tokio::test]
async fn scripted_failures_are_journaled_without_writes() -> Result<()> {
    let ctx = RequestContext::new_request();
    let store = InMemoryEnvironmentStore::new();
    store.fail_next(
        StoreOperation::InsertEnvironment,
        store_rejected_error("permission denied for table environments"),
    );

    let error = store.insert_environment(&ctx, environment("ci-env")).await.err();
    assert_eq!(
        error.map(|error| error.message),
        Some("permission denied for table environments".to_string())
    );
    assert!(store.environments().await.is_empty());
    assert_eq!(store.operations(), vec![StoreOperation::InsertEnvironment]);
    Ok(())
}

#[tokio::test]
async fn cancelled_context_short_circuits() -> Result<()> {
    let ctx = RequestContext::new_request();
    ctx.cancel();
    let store = InMemoryEnvironmentStore::new();

    let error = store.list_environments(&ctx).await.err();
    assert!(error.is_some_and(|error| error.is_cancelled()));
    Ok(())
}

#[test]
fn collaborator_doubles_are_object_safe() {
    let logger: Arc<dyn LoggerPort> = Arc::new(NoopLogger);
    logger.info("environment.list.start", "started", None);

    let notifier = RecordingNotifier::new();
    let shared: Arc<dyn NotifierPort> = Arc::new(notifier.clone());
    shared.success("Environment created successfully", None);
    shared.error("Failed to create environment", Some("boom"));
    assert_eq!(notifier.success_count(), 1);
    assert_eq!(notifier.error_count(), 1);
    assert_eq!(
        notifier.last().and_then(|toast| toast.description).as_deref(),
        Some("boom")
    );
}
