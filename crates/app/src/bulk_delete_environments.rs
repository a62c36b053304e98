//! Delete many rows by id.

use crate::gateway::EnvironmentGatewayDeps;
use crate::operation_log::{OperationLog, log_fields};
use codex_env_domain::EnvironmentId;
use codex_env_shared::{RequestContext, Result};
use serde_json::Value;

/// Result of a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkDeleteOutput {
    /// Number of ids targeted.
    pub deleted_count: usize,
}

/// Delete every listed row. Variable rows go with them on the backend.
pub async fn bulk_delete_environments(
    ctx: &RequestContext,
    deps: &EnvironmentGatewayDeps,
    ids: Vec<EnvironmentId>,
) -> Result<BulkDeleteOutput> {
    let log = OperationLog::start(
        deps.logger.as_ref(),
        "bulk_delete",
        log_fields([("requestedCount", Value::from(ids.len()))]),
    );

    let deleted_count = ids.len();
    let result: Result<()> = async {
        if ids.is_empty() {
            return Ok(());
        }
        ctx.ensure_not_cancelled("bulk_delete_environments")?;
        deps.store.delete_environments(ctx, ids).await
    }
    .await;

    match result {
        Ok(()) => {
            log.completed(log_fields([("deletedCount", Value::from(deleted_count))]));
            Ok(BulkDeleteOutput { deleted_count })
        },
        Err(error) => {
            log.failed(&error);
            Err(error)
        },
    }
}
