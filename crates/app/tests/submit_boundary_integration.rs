//! Integration tests for the submit boundary: toasts, the in-flight guard,
//! and end-to-end form flows.

#![allow(trivial_casts, reason = "explicit unsizing casts document the port trait objects under test")]

use codex_env_app::{
    EnvironmentForm, EnvironmentGatewayDeps, EnvironmentSelection, FormAction, RowList, RowPart,
    SubmitBoundary, SubmitOutcome, list_environments,
};
use codex_env_domain::{
    EnvironmentId, EnvironmentPatch, EnvironmentRecord, EnvironmentVariable, LanguageRuntime,
    NewEnvironment,
};
use codex_env_ports::{BoxFuture, EnvironmentStorePort, NotificationLevel, NotifierPort};
use codex_env_shared::{ErrorCode, RequestContext, Result};
use codex_env_testkit::errors::{store_rejected_error, store_transport_error};
use codex_env_testkit::in_memory::{InMemoryEnvironmentStore, RecordingNotifier, StoreOperation};
use std::sync::Arc;
use tokio::sync::Notify;

fn boundary_over(store: Arc<dyn EnvironmentStorePort>) -> (SubmitBoundary, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let deps = EnvironmentGatewayDeps {
        store,
        logger: None,
    };
    let boundary = SubmitBoundary::new(deps, Arc::new(notifier.clone()) as Arc<dyn NotifierPort>);
    (boundary, notifier)
}

fn setup() -> (Arc<InMemoryEnvironmentStore>, SubmitBoundary, RecordingNotifier) {
    let store = Arc::new(InMemoryEnvironmentStore::new());
    let (boundary, notifier) = boundary_over(Arc::clone(&store) as Arc<dyn EnvironmentStorePort>);
    (store, boundary, notifier)
}

fn type_row(form: &mut EnvironmentForm, list: RowList, key: &str, value: &str) {
    let row = form.rows(list).last().map(|draft| draft.id);
    let Some(row) = row else {
        return;
    };
    form.dispatch(FormAction::EditRow {
        list,
        row,
        part: RowPart::Key,
        text: key.to_string(),
    });
    form.dispatch(FormAction::BlurKey { list, row });
    form.dispatch(FormAction::EditRow {
        list,
        row,
        part: RowPart::Value,
        text: value.to_string(),
    });
}

fn named(name: &str) -> NewEnvironment {
    NewEnvironment {
        name: name.into(),
        ..NewEnvironment::default()
    }
}

fn assert_toast(notifier: &RecordingNotifier, level: NotificationLevel, message: &str, description: Option<&str>) {
    let last = notifier.last();
    assert_eq!(last.as_ref().map(|toast| toast.level), Some(level));
    assert_eq!(last.as_ref().map(|toast| &*toast.message), Some(message));
    assert_eq!(
        last.as_ref().and_then(|toast| toast.description.as_deref()),
        description
    );
}

#[tokio::test]
async fn create_flow_stores_normalized_variables_and_secrets() -> Result<()> {
    let (store, boundary, notifier) = setup();
    let mut form = EnvironmentForm::new();
    form.dispatch(FormAction::SetName("  ci-env ".to_string()));
    type_row(&mut form, RowList::Variables, "api_key", "abc");
    type_row(&mut form, RowList::Secrets, "token", "s3cret");

    let outcome = boundary.submit_create(&form.snapshot()).await;

    let SubmitOutcome::Completed(id) = outcome else {
        panic!("create should complete, got {outcome:?}");
    };
    let records = store.environments().await;
    assert_eq!(records.len(), 1);
    assert_eq!(&*records[0].name, "ci-env");
    assert_eq!(records[0].versions.get(LanguageRuntime::Python), "3.12");
    assert_eq!(records[0].setup_script, None);

    let variables: Vec<(String, bool)> = store
        .variables_for(&id)
        .await
        .iter()
        .map(|variable: &EnvironmentVariable| (variable.name().as_str().to_string(), variable.is_secret()))
        .collect();
    assert_eq!(
        variables,
        [("API_KEY".to_string(), false), ("TOKEN".to_string(), true)]
    );
    assert_toast(
        &notifier,
        NotificationLevel::Success,
        "Environment created successfully",
        None,
    );
    Ok(())
}

#[tokio::test]
async fn half_filled_row_is_rejected_before_any_request() -> Result<()> {
    let (store, boundary, notifier) = setup();
    let mut form = EnvironmentForm::new();
    form.dispatch(FormAction::SetName("ci-env".to_string()));
    type_row(&mut form, RowList::Variables, "a", "");

    let outcome = boundary.submit_create(&form.snapshot()).await;

    assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
    assert!(store.journal().is_empty());
    assert_toast(
        &notifier,
        NotificationLevel::Error,
        "Please check your input and try again",
        Some("Environment variables and secrets require both a key and value."),
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_keys_are_rejected_with_the_key_named() -> Result<()> {
    let (store, boundary, notifier) = setup();
    let mut form = EnvironmentForm::new();
    form.dispatch(FormAction::SetName("ci-env".to_string()));
    type_row(&mut form, RowList::Variables, "a", "1");
    type_row(&mut form, RowList::Variables, "A", "2");

    let outcome = boundary.submit_create(&form.snapshot()).await;

    let SubmitOutcome::Invalid(error) = outcome else {
        panic!("duplicate keys must not validate");
    };
    assert_eq!(error.code, ErrorCode::variable_duplicate_key());
    assert!(error.message.contains("\"A\""));
    assert!(store.journal().is_empty());
    assert_eq!(notifier.error_count(), 1);
    Ok(())
}

#[tokio::test]
async fn backend_rejection_shows_the_backend_message() -> Result<()> {
    let (store, boundary, notifier) = setup();
    store.fail_next(
        StoreOperation::InsertEnvironment,
        store_rejected_error("duplicate key value violates unique constraint"),
    );
    let mut form = EnvironmentForm::new();
    form.dispatch(FormAction::SetName("ci-env".to_string()));

    let outcome = boundary.submit_create(&form.snapshot()).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_toast(
        &notifier,
        NotificationLevel::Error,
        "Failed to create environment",
        Some("duplicate key value violates unique constraint"),
    );
    Ok(())
}

#[tokio::test]
async fn transport_failure_shows_the_generic_message() -> Result<()> {
    let (store, boundary, notifier) = setup();
    store.fail_next(StoreOperation::InsertEnvironment, store_transport_error());
    let mut form = EnvironmentForm::new();
    form.dispatch(FormAction::SetName("ci-env".to_string()));

    let outcome = boundary.submit_create(&form.snapshot()).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_toast(
        &notifier,
        NotificationLevel::Error,
        "An unexpected error occurred while creating the environment.",
        None,
    );
    assert!(!boundary.is_submitting());
    Ok(())
}

#[tokio::test]
async fn edit_flow_updates_every_column() -> Result<()> {
    let (store, boundary, notifier) = setup();
    let ctx = RequestContext::new_request();
    let id = store.seed(named("before")).await?;
    let record = store
        .get_environment(&ctx, id.clone())
        .await?
        .ok_or_else(|| store_rejected_error("seeded row missing"))?;

    let mut form = EnvironmentForm::from_record(&record);
    form.dispatch(FormAction::SetName("after".to_string()));
    form.dispatch(FormAction::SetSetupScriptMode("2".to_string()));
    form.dispatch(FormAction::SetSetupScript("  make bootstrap  ".to_string()));

    let outcome = boundary.submit_update(id, &form.snapshot()).await;

    let SubmitOutcome::Completed(updated) = outcome else {
        panic!("update should complete");
    };
    assert_eq!(&*updated.name, "after");
    assert_eq!(updated.setup_script.as_deref(), Some("make bootstrap"));
    assert_toast(
        &notifier,
        NotificationLevel::Success,
        "Environment updated successfully",
        None,
    );
    Ok(())
}

#[tokio::test]
async fn bulk_edit_with_nothing_touched_sends_no_update() -> Result<()> {
    let (store, boundary, notifier) = setup();
    for name in ["alpha", "beta", "gamma"] {
        store.seed(named(name)).await?;
    }
    let ctx = RequestContext::new_request();
    let listing = list_environments(
        &ctx,
        &EnvironmentGatewayDeps {
            store: Arc::clone(&store) as Arc<dyn EnvironmentStorePort>,
            logger: None,
        },
    )
    .await?;
    let mut selection = EnvironmentSelection::new(&listing);
    selection.select_all();

    let mut form = EnvironmentForm::for_bulk_edit();
    let snapshot = form.dispatch(FormAction::SetDescription(String::new()));
    let outcome = boundary
        .submit_bulk_update(selection.selected_ids(), &snapshot)
        .await;

    let SubmitOutcome::Completed(output) = outcome else {
        panic!("bulk update should complete");
    };
    assert_eq!(output.updated_count, 3);
    assert!(output.applied_fields.is_empty());
    assert!(
        !store
            .operations()
            .contains(&StoreOperation::UpdateEnvironments)
    );
    assert_toast(
        &notifier,
        NotificationLevel::Success,
        "Environments updated successfully",
        Some("3 environments updated."),
    );
    Ok(())
}

#[tokio::test]
async fn bulk_edit_leaves_untouched_columns_alone() -> Result<()> {
    let (store, boundary, _notifier) = setup();
    let first = store.seed(named("alpha")).await?;
    let second = store.seed(named("beta")).await?;

    let mut form = EnvironmentForm::for_bulk_edit();
    let snapshot = form.dispatch(FormAction::SetVersion(LanguageRuntime::Rust, "1.88.0".to_string()));
    let outcome = boundary
        .submit_bulk_update(vec![first, second], &snapshot)
        .await;

    assert!(outcome.is_completed());
    for record in store.environments().await {
        assert_eq!(record.versions.get(LanguageRuntime::Rust), "1.88.0");
        assert!(["alpha", "beta"].contains(&&*record.name));
    }
    let patch = store
        .journal()
        .into_iter()
        .find_map(|call| call.patch)
        .unwrap_or_else(EnvironmentPatch::new);
    assert_eq!(patch.len(), 1);
    Ok(())
}

#[tokio::test]
async fn bulk_delete_toast_uses_the_singular_for_one() -> Result<()> {
    let (store, boundary, notifier) = setup();
    let id = store.seed(named("solo")).await?;

    let outcome = boundary.submit_bulk_delete(vec![id]).await;

    assert!(outcome.is_completed());
    assert!(store.environments().await.is_empty());
    assert_toast(
        &notifier,
        NotificationLevel::Success,
        "Environments deleted successfully",
        Some("1 environment deleted."),
    );
    Ok(())
}

#[tokio::test]
async fn bulk_delete_failure_names_the_operation() -> Result<()> {
    let (store, boundary, notifier) = setup();
    let id = store.seed(named("solo")).await?;
    store.fail_next(
        StoreOperation::DeleteEnvironments,
        store_rejected_error("permission denied for table environments"),
    );

    let outcome = boundary.submit_bulk_delete(vec![id]).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_toast(
        &notifier,
        NotificationLevel::Error,
        "Failed to delete environments",
        Some("permission denied for table environments"),
    );
    Ok(())
}

#[tokio::test]
async fn second_submission_is_refused_while_one_is_in_flight() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(ScriptedStore::gated(Arc::clone(&gate)));
    let (boundary, notifier) = boundary_over(Arc::clone(&store) as Arc<dyn EnvironmentStorePort>);
    let mut form = EnvironmentForm::new();
    let snapshot = form.dispatch(FormAction::SetName("ci-env".to_string()));

    let first = boundary.submit_create(&snapshot);
    let second = async {
        tokio::task::yield_now().await;
        let busy = boundary.is_submitting();
        let outcome = boundary.submit_create(&snapshot).await;
        gate.notify_one();
        (busy, outcome)
    };
    let (first, (busy, second)) = tokio::join!(first, second);

    assert!(busy);
    assert!(first.is_completed());
    assert_eq!(second, SubmitOutcome::Busy);
    assert_eq!(store.inner.environments().await.len(), 1);
    assert_eq!(notifier.notifications().len(), 1);
    assert!(!boundary.is_submitting());
    Ok(())
}

#[tokio::test]
async fn panicking_store_becomes_an_unexpected_error_toast() -> Result<()> {
    let store = Arc::new(ScriptedStore::panicking());
    let (boundary, notifier) = boundary_over(store as Arc<dyn EnvironmentStorePort>);
    let mut form = EnvironmentForm::new();
    let snapshot = form.dispatch(FormAction::SetName("ci-env".to_string()));

    let outcome = boundary.submit_create(&snapshot).await;

    let SubmitOutcome::Failed(error) = outcome else {
        panic!("a panic must surface as a failure");
    };
    assert_eq!(error.code, ErrorCode::internal());
    assert_toast(
        &notifier,
        NotificationLevel::Error,
        "An unexpected error occurred while creating the environment.",
        None,
    );
    assert!(!boundary.is_submitting());
    Ok(())
}

/// In-memory store whose parent insert can wait on a gate or panic.
struct ScriptedStore {
    inner: InMemoryEnvironmentStore,
    gate: Option<Arc<Notify>>,
    panic_on_insert: bool,
}

impl ScriptedStore {
    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            inner: InMemoryEnvironmentStore::new(),
            gate: Some(gate),
            panic_on_insert: false,
        }
    }

    fn panicking() -> Self {
        Self {
            inner: InMemoryEnvironmentStore::new(),
            gate: None,
            panic_on_insert: true,
        }
    }
}

impl EnvironmentStorePort for ScriptedStore {
    fn insert_environment(
        &self,
        ctx: &RequestContext,
        environment: NewEnvironment,
    ) -> BoxFuture<'_, Result<EnvironmentId>> {
        let ctx = ctx.clone();
        let gate = self.gate.clone();
        let panic_on_insert = self.panic_on_insert;
        Box::pin(async move {
            if panic_on_insert {
                panic!("store exploded");
            }
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.inner.insert_environment(&ctx, environment).await
        })
    }

    fn insert_variables(
        &self,
        ctx: &RequestContext,
        environment_id: EnvironmentId,
        variables: Vec<EnvironmentVariable>,
    ) -> BoxFuture<'_, Result<()>> {
        self.inner.insert_variables(ctx, environment_id, variables)
    }

    fn update_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<EnvironmentRecord>> {
        self.inner.update_environment(ctx, id, patch)
    }

    fn update_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<()>> {
        self.inner.update_environments(ctx, ids, patch)
    }

    fn delete_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<()>> {
        self.inner.delete_environment(ctx, id)
    }

    fn delete_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
    ) -> BoxFuture<'_, Result<()>> {
        self.inner.delete_environments(ctx, ids)
    }

    fn get_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<Option<EnvironmentRecord>>> {
        self.inner.get_environment(ctx, id)
    }

    fn list_environments(
        &self,
        ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<EnvironmentRecord>>> {
        self.inner.list_environments(ctx)
    }
}
