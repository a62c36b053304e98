//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the use cases
//! - Contract tests shared with the real store adapter
//! - Scripted failures (`fail_next`) to exercise compensation paths

use codex_env_domain::{
    ContainerImage, EnvironmentField, EnvironmentId, EnvironmentPatch, EnvironmentRecord,
    EnvironmentVariable, NewEnvironment, PatchValue, SetupScriptMode,
};
use codex_env_ports::{
    BoxFuture, EnvironmentStorePort, LogEvent, LogFields, LoggerPort, Notification,
    NotificationLevel, NotifierPort,
};
use codex_env_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event for later assertions.
///
/// Children share the same buffer and stamp their base fields onto events.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of the recorded events, oldest first.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.event.to_string())
            .collect()
    }

    /// First event with the given name.
    pub fn find(&self, name: &str) -> Option<LogEvent> {
        self.events()
            .into_iter()
            .find(|event| &*event.event == name)
    }

    /// Field value of the first event with the given name.
    pub fn field(&self, name: &str, key: &str) -> Option<Value> {
        self.find(name)
            .and_then(|event| event.fields)
            .and_then(|fields| fields.get(key).cloned())
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(fields);
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// Notifier that keeps every toast for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded notifications, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent notification.
    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }

    /// Number of success toasts shown.
    pub fn success_count(&self) -> usize {
        self.count(NotificationLevel::Success)
    }

    /// Number of error toasts shown.
    pub fn error_count(&self) -> usize {
        self.count(NotificationLevel::Error)
    }

    fn count(&self, level: NotificationLevel) -> usize {
        self.notifications()
            .iter()
            .filter(|notification| notification.level == level)
            .count()
    }
}

impl NotifierPort for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Store operations, one per port method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreOperation {
    /// `insert_environment`
    InsertEnvironment,
    /// `insert_variables`
    InsertVariables,
    /// `update_environment`
    UpdateEnvironment,
    /// `update_environments`
    UpdateEnvironments,
    /// `delete_environment`
    DeleteEnvironment,
    /// `delete_environments`
    DeleteEnvironments,
    /// `get_environment`
    GetEnvironment,
    /// `list_environments`
    ListEnvironments,
}

/// One call observed by [`InMemoryEnvironmentStore`], failed calls included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    /// Port method.
    pub operation: StoreOperation,
    /// Target ids, empty for inserts and list.
    pub ids: Vec<EnvironmentId>,
    /// Patch sent, for updates.
    pub patch: Option<EnvironmentPatch>,
    /// Number of variable rows sent, for variable inserts.
    pub variable_count: usize,
}

impl StoreCall {
    fn new(operation: StoreOperation) -> Self {
        Self {
            operation,
            ids: Vec::new(),
            patch: None,
            variable_count: 0,
        }
    }

    fn with_ids(mut self, ids: Vec<EnvironmentId>) -> Self {
        self.ids = ids;
        self
    }
}

#[derive(Debug, Default)]
struct StoreState {
    // Newest first, matching the list order of the real backend.
    rows: Vec<EnvironmentRecord>,
    variables: BTreeMap<EnvironmentId, Vec<EnvironmentVariable>>,
    next_id: u64,
}

/// In-memory `environments` / `environment_variables` tables.
#[derive(Debug, Default)]
pub struct InMemoryEnvironmentStore {
    state: RwLock<StoreState>,
    failures: Mutex<BTreeMap<StoreOperation, VecDeque<ErrorEnvelope>>>,
    journal: Mutex<Vec<StoreCall>>,
}

impl InMemoryEnvironmentStore {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// Queued failures are consumed in order; the failing call writes nothing.
    pub fn fail_next(&self, operation: StoreOperation, error: ErrorEnvelope) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Every call seen so far, oldest first.
    pub fn journal(&self) -> Vec<StoreCall> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Operations seen so far, oldest first.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.journal()
            .into_iter()
            .map(|call| call.operation)
            .collect()
    }

    /// Insert a row directly, bypassing the journal and failure queue.
    pub async fn seed(&self, environment: NewEnvironment) -> Result<EnvironmentId> {
        let mut state = self.state.write().await;
        insert_row(&mut state, environment)
    }

    /// Rows currently stored, newest first.
    pub async fn environments(&self) -> Vec<EnvironmentRecord> {
        self.state.read().await.rows.clone()
    }

    /// Variable rows owned by `id`.
    pub async fn variables_for(&self, id: &EnvironmentId) -> Vec<EnvironmentVariable> {
        self.state
            .read()
            .await
            .variables
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, ctx: &RequestContext, call: StoreCall) -> Result<()> {
        let operation = call.operation;
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        ctx.ensure_not_cancelled("in_memory_store")?;
        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);
        scripted.map_or(Ok(()), Err)
    }
}

impl EnvironmentStorePort for InMemoryEnvironmentStore {
    fn insert_environment(
        &self,
        ctx: &RequestContext,
        environment: NewEnvironment,
    ) -> BoxFuture<'_, Result<EnvironmentId>> {
        let started = self.begin(ctx, StoreCall::new(StoreOperation::InsertEnvironment));
        Box::pin(async move {
            started?;
            let mut state = self.state.write().await;
            insert_row(&mut state, environment)
        })
    }

    fn insert_variables(
        &self,
        ctx: &RequestContext,
        environment_id: EnvironmentId,
        variables: Vec<EnvironmentVariable>,
    ) -> BoxFuture<'_, Result<()>> {
        let call = StoreCall {
            variable_count: variables.len(),
            ..StoreCall::new(StoreOperation::InsertVariables).with_ids(vec![environment_id.clone()])
        };
        let started = self.begin(ctx, call);
        Box::pin(async move {
            started?;
            let mut state = self.state.write().await;
            if !state.rows.iter().any(|row| row.id == environment_id) {
                return Err(rejected(
                    "insert or update on table \"environment_variables\" violates foreign key constraint",
                ));
            }
            let owned = state.variables.entry(environment_id).or_default();
            for variable in &variables {
                if owned.iter().any(|existing| existing.name() == variable.name()) {
                    return Err(rejected(
                        "duplicate key value violates unique constraint \"environment_variables_environment_id_name_key\"",
                    ));
                }
            }
            owned.extend(variables);
            Ok(())
        })
    }

    fn update_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<EnvironmentRecord>> {
        let call = StoreCall {
            patch: Some(patch.clone()),
            ..StoreCall::new(StoreOperation::UpdateEnvironment).with_ids(vec![id.clone()])
        };
        let started = self.begin(ctx, call);
        Box::pin(async move {
            started?;
            let mut state = self.state.write().await;
            let stamp = next_stamp(&mut state);
            let Some(row) = state.rows.iter_mut().find(|row| row.id == id) else {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::store_not_found(),
                    "Environment not found",
                )
                .with_metadata("operation", "update_environment"));
            };
            let mut updated = row.clone();
            apply_patch(&mut updated, &patch)?;
            updated.updated_at = Some(stamp.into());
            *row = updated.clone();
            Ok(updated)
        })
    }

    fn update_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<()>> {
        let call = StoreCall {
            patch: Some(patch.clone()),
            ..StoreCall::new(StoreOperation::UpdateEnvironments).with_ids(ids.clone())
        };
        let started = self.begin(ctx, call);
        Box::pin(async move {
            started?;
            let mut state = self.state.write().await;
            let stamp = next_stamp(&mut state);
            let mut updated = state.rows.clone();
            for row in updated.iter_mut().filter(|row| ids.contains(&row.id)) {
                apply_patch(row, &patch)?;
                row.updated_at = Some(stamp.as_str().into());
            }
            // All or nothing, like a single UPDATE statement.
            state.rows = updated;
            Ok(())
        })
    }

    fn delete_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<()>> {
        let started = self.begin(
            ctx,
            StoreCall::new(StoreOperation::DeleteEnvironment).with_ids(vec![id.clone()]),
        );
        Box::pin(async move {
            started?;
            let mut state = self.state.write().await;
            delete_rows(&mut state, std::slice::from_ref(&id));
            Ok(())
        })
    }

    fn delete_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
    ) -> BoxFuture<'_, Result<()>> {
        let started = self.begin(
            ctx,
            StoreCall::new(StoreOperation::DeleteEnvironments).with_ids(ids.clone()),
        );
        Box::pin(async move {
            started?;
            let mut state = self.state.write().await;
            delete_rows(&mut state, &ids);
            Ok(())
        })
    }

    fn get_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<Option<EnvironmentRecord>>> {
        let started = self.begin(
            ctx,
            StoreCall::new(StoreOperation::GetEnvironment).with_ids(vec![id.clone()]),
        );
        Box::pin(async move {
            started?;
            let state = self.state.read().await;
            Ok(state.rows.iter().find(|row| row.id == id).cloned())
        })
    }

    fn list_environments(
        &self,
        ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<EnvironmentRecord>>> {
        let started = self.begin(ctx, StoreCall::new(StoreOperation::ListEnvironments));
        Box::pin(async move {
            started?;
            Ok(self.state.read().await.rows.clone())
        })
    }
}

fn rejected(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::store_rejected(), message)
}

fn next_stamp(state: &mut StoreState) -> String {
    state.next_id += 1;
    format!("2026-01-01T00:00:{:02}.{:06}Z", state.next_id % 60, state.next_id)
}

fn insert_row(state: &mut StoreState, environment: NewEnvironment) -> Result<EnvironmentId> {
    let stamp = next_stamp(state);
    let id = EnvironmentId::parse(format!("env-{:04}", state.next_id))
        .map_err(ErrorEnvelope::from)?;
    let record = EnvironmentRecord {
        id: id.clone(),
        name: environment.name,
        description: environment.description,
        github_org: environment.github_org,
        github_repo: environment.github_repo,
        container_image: environment.container_image,
        versions: environment.versions,
        setup_script_mode: environment.setup.mode(),
        setup_script: environment.setup.script().map(Into::into),
        container_caching_enabled: environment.container_caching_enabled,
        internet_access_enabled: environment.internet_access_enabled,
        created_at: Some(stamp.as_str().into()),
        updated_at: Some(stamp.into()),
        created_by: Some("user-test".into()),
    };
    state.rows.insert(0, record);
    Ok(id)
}

fn delete_rows(state: &mut StoreState, ids: &[EnvironmentId]) {
    state.rows.retain(|row| !ids.contains(&row.id));
    // Child rows go with their parent.
    state.variables.retain(|owner, _| !ids.contains(owner));
}

fn apply_patch(record: &mut EnvironmentRecord, patch: &EnvironmentPatch) -> Result<()> {
    for (field, value) in patch.iter() {
        match (field, value) {
            (EnvironmentField::Name, PatchValue::Text(text)) => record.name = text.clone(),
            (EnvironmentField::Description, value) => record.description = nullable(field, value)?,
            (EnvironmentField::GithubOrg, value) => record.github_org = nullable(field, value)?,
            (EnvironmentField::GithubRepo, value) => record.github_repo = nullable(field, value)?,
            (EnvironmentField::SetupScript, value) => record.setup_script = nullable(field, value)?,
            (EnvironmentField::ContainerImage, PatchValue::Text(text)) => {
                record.container_image = ContainerImage::parse(text)
                    .ok_or_else(|| rejected("invalid input value for enum container_image"))?;
            },
            (EnvironmentField::Version(runtime), PatchValue::Text(text)) => {
                record.versions.set(runtime, text.clone());
            },
            (EnvironmentField::SetupScriptMode, PatchValue::Text(text)) => {
                record.setup_script_mode = SetupScriptMode::parse(text)
                    .ok_or_else(|| rejected("invalid input value for enum setup_script_mode"))?;
            },
            (EnvironmentField::ContainerCachingEnabled, PatchValue::Flag(flag)) => {
                record.container_caching_enabled = *flag;
            },
            (EnvironmentField::InternetAccessEnabled, PatchValue::Flag(flag)) => {
                record.internet_access_enabled = *flag;
            },
            (field, _) => {
                return Err(rejected(&format!(
                    "null value in column \"{}\" violates not-null constraint",
                    field.column()
                )));
            },
        }
    }
    Ok(())
}

fn nullable(field: EnvironmentField, value: &PatchValue) -> Result<Option<Box<str>>> {
    match value {
        PatchValue::Null => Ok(None),
        PatchValue::Text(text) => Ok(Some(text.clone())),
        PatchValue::Flag(_) => Err(rejected(&format!(
            "invalid input syntax for column \"{}\"",
            field.column()
        ))),
    }
}
