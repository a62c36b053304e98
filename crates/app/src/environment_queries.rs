//! Read-side use cases: one row, or the full listing.

use crate::gateway::EnvironmentGatewayDeps;
use crate::operation_log::{OperationLog, log_fields};
use codex_env_domain::{EnvironmentId, EnvironmentRecord};
use codex_env_shared::{RequestContext, Result};
use serde_json::Value;

/// All environments, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvironmentListing {
    /// Rows, newest first.
    pub environments: Vec<EnvironmentRecord>,
    /// Row count.
    pub total: usize,
}

/// Fetch one row. `Ok(None)` means the row does not exist.
pub async fn get_environment(
    ctx: &RequestContext,
    deps: &EnvironmentGatewayDeps,
    id: EnvironmentId,
) -> Result<Option<EnvironmentRecord>> {
    let log = OperationLog::start(
        deps.logger.as_ref(),
        "get",
        log_fields([("environmentId", Value::from(id.as_str()))]),
    );
    let result: Result<Option<EnvironmentRecord>> = async {
        ctx.ensure_not_cancelled("get_environment")?;
        deps.store.get_environment(ctx, id).await
    }
    .await;
    match &result {
        Ok(found) => log.completed(log_fields([("found", Value::from(found.is_some()))])),
        Err(error) => log.failed(error),
    }
    result
}

/// Fetch every row.
pub async fn list_environments(
    ctx: &RequestContext,
    deps: &EnvironmentGatewayDeps,
) -> Result<EnvironmentListing> {
    let log = OperationLog::start(deps.logger.as_ref(), "list", log_fields([]));
    let result: Result<Vec<EnvironmentRecord>> = async {
        ctx.ensure_not_cancelled("list_environments")?;
        deps.store.list_environments(ctx).await
    }
    .await;
    match result {
        Ok(environments) => {
            let total = environments.len();
            log.completed(log_fields([("total", Value::from(total))]));
            Ok(EnvironmentListing {
                environments,
                total,
            })
        },
        Err(error) => {
            log.failed(&error);
            Err(error)
        },
    }
}
