//! Create an environment and its variable rows.
//!
//! The two inserts are not atomic. When the variable insert fails, the new
//! parent row is deleted again; if that delete also fails the caller gets an
//! `environment:inconsistent_state` invariant error naming the orphaned row.

use crate::gateway::EnvironmentGatewayDeps;
use crate::operation_log::{OperationLog, log_fields};
use codex_env_domain::{EnvironmentId, NewEnvironment};
use codex_env_ports::LogLevel;
use codex_env_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result, Validate};
use serde_json::Value;

/// Validate, insert the row, insert its variables, compensate on failure.
pub async fn create_environment(
    ctx: &RequestContext,
    deps: &EnvironmentGatewayDeps,
    environment: NewEnvironment,
) -> Result<EnvironmentId> {
    let log = OperationLog::start(
        deps.logger.as_ref(),
        "create",
        log_fields([
            ("name", Value::from(&*environment.name)),
            ("variableCount", Value::from(environment.variables.len())),
        ]),
    );

    match run(ctx, deps, &log, environment).await {
        Ok(id) => {
            log.completed(log_fields([("environmentId", Value::from(id.as_str()))]));
            Ok(id)
        },
        Err(error) => {
            log.failed(&error);
            Err(error)
        },
    }
}

async fn run(
    ctx: &RequestContext,
    deps: &EnvironmentGatewayDeps,
    log: &OperationLog<'_>,
    mut environment: NewEnvironment,
) -> Result<EnvironmentId> {
    environment.validate().map_err(ErrorEnvelope::from)?;
    ctx.ensure_not_cancelled("create_environment.insert")?;

    let variables = std::mem::take(&mut environment.variables);
    let id = deps.store.insert_environment(ctx, environment).await?;
    if variables.is_empty() {
        return Ok(id);
    }

    let Err(insert_error) = deps
        .store
        .insert_variables(ctx, id.clone(), variables)
        .await
    else {
        return Ok(id);
    };

    log.step_failure(LogLevel::Warn, "compensating", &insert_error);
    // The submission may have been cancelled; cleanup still has to run.
    let cleanup_ctx = RequestContext::new(ctx.correlation_id().clone());
    match deps.store.delete_environment(&cleanup_ctx, id.clone()).await {
        Ok(()) => {
            log.emit(
                LogLevel::Info,
                "compensated",
                "Removed environment after variable insert failed",
                log_fields([("environmentId", Value::from(id.as_str()))]),
            );
            Err(insert_error)
        },
        Err(delete_error) => {
            let error = inconsistent_state(&id, &insert_error, &delete_error);
            log.step_failure(LogLevel::Error, "inconsistent", &error);
            Err(error)
        },
    }
}

fn inconsistent_state(
    id: &EnvironmentId,
    insert_error: &ErrorEnvelope,
    delete_error: &ErrorEnvelope,
) -> ErrorEnvelope {
    ErrorEnvelope::invariant(
        ErrorCode::inconsistent_state(),
        format!(
            "Environment {id} was created without its variables ({}) and could not be removed ({})",
            insert_error.message, delete_error.message
        ),
    )
    .with_metadata("environment_id", id.as_str())
    .with_metadata("variable_insert_code", insert_error.code.to_string())
    .with_metadata("variable_insert_error", insert_error.message.as_str())
    .with_metadata("compensation_code", delete_error.code.to_string())
    .with_metadata("compensation_error", delete_error.message.as_str())
}
