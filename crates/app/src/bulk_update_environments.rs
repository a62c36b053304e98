//! Apply one partial update to many rows.

use crate::gateway::EnvironmentGatewayDeps;
use crate::operation_log::{OperationLog, log_fields};
use crate::transform::strip_untouched;
use codex_env_domain::{EnvironmentField, EnvironmentId, EnvironmentPatch};
use codex_env_shared::{ErrorEnvelope, RequestContext, Result, Validate};
use serde_json::Value;

/// Input payload for a bulk update.
#[derive(Debug, Clone)]
pub struct BulkUpdateInput {
    /// Target rows. Unknown ids are not pre-filtered.
    pub ids: Vec<EnvironmentId>,
    /// Columns to write; blanks are dropped before anything else.
    pub patch: EnvironmentPatch,
}

/// Result of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkUpdateOutput {
    /// Number of ids targeted, not rows changed.
    pub updated_count: usize,
    /// Columns written, empty when nothing was sent.
    pub applied_fields: Vec<EnvironmentField>,
}

/// Strip untouched columns, validate the rest, update every listed row.
///
/// An empty patch after stripping sends nothing and still succeeds.
pub async fn bulk_update_environments(
    ctx: &RequestContext,
    deps: &EnvironmentGatewayDeps,
    input: BulkUpdateInput,
) -> Result<BulkUpdateOutput> {
    let log = OperationLog::start(
        deps.logger.as_ref(),
        "bulk_update",
        log_fields([("requestedCount", Value::from(input.ids.len()))]),
    );

    let result: Result<BulkUpdateOutput> = async {
        let patch = strip_untouched(input.patch).with_setup_script_rule();
        patch.validate().map_err(ErrorEnvelope::from)?;
        let updated_count = input.ids.len();
        if patch.is_empty() || input.ids.is_empty() {
            return Ok(BulkUpdateOutput {
                updated_count,
                applied_fields: Vec::new(),
            });
        }
        ctx.ensure_not_cancelled("bulk_update_environments")?;
        let applied_fields = patch.iter().map(|(field, _)| field).collect();
        deps.store.update_environments(ctx, input.ids, patch).await?;
        Ok(BulkUpdateOutput {
            updated_count,
            applied_fields,
        })
    }
    .await;

    match &result {
        Ok(output) => log.completed(log_fields([
            ("updatedCount", Value::from(output.updated_count)),
            (
                "appliedFields",
                Value::from(
                    output
                        .applied_fields
                        .iter()
                        .map(|field| field.column())
                        .collect::<Vec<_>>(),
                ),
            ),
        ])),
        Err(error) => log.failed(error),
    }
    result
}
