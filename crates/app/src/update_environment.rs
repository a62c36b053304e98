//! Update a single environment row.

use crate::gateway::EnvironmentGatewayDeps;
use crate::operation_log::{OperationLog, log_fields};
use codex_env_domain::{EnvironmentId, EnvironmentPatch, EnvironmentRecord};
use codex_env_shared::{ErrorEnvelope, RequestContext, Result, Validate};
use serde_json::Value;

/// Input payload for a single update.
#[derive(Debug, Clone)]
pub struct UpdateEnvironmentInput {
    /// Target row.
    pub id: EnvironmentId,
    /// Columns to write.
    pub patch: EnvironmentPatch,
}

/// Validate the patch against the partial rules and update one row.
///
/// Setting the mode to automatic also clears the stored script.
pub async fn update_environment(
    ctx: &RequestContext,
    deps: &EnvironmentGatewayDeps,
    input: UpdateEnvironmentInput,
) -> Result<EnvironmentRecord> {
    let log = OperationLog::start(
        deps.logger.as_ref(),
        "update",
        log_fields([
            ("environmentId", Value::from(input.id.as_str())),
            ("fieldCount", Value::from(input.patch.len())),
        ]),
    );

    let result: Result<EnvironmentRecord> = async {
        let patch = input.patch.with_setup_script_rule();
        patch.validate().map_err(ErrorEnvelope::from)?;
        ctx.ensure_not_cancelled("update_environment")?;
        deps.store.update_environment(ctx, input.id, patch).await
    }
    .await;

    match &result {
        Ok(_) => log.completed(log_fields([])),
        Err(error) => log.failed(error),
    }
    result
}
