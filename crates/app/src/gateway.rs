//! Persistence gateway: dependencies and the discriminated-result surface.
//!
//! The use-case functions return `Result<_, ErrorEnvelope>`. `EnvironmentGateway`
//! wraps them for callers that want `{ success, data | error }` and never see
//! an error escape.

use crate::bulk_delete_environments::bulk_delete_environments;
use crate::bulk_update_environments::{BulkUpdateInput, bulk_update_environments};
use crate::create_environment::create_environment;
use crate::environment_queries::{EnvironmentListing, get_environment, list_environments};
use crate::update_environment::{UpdateEnvironmentInput, update_environment};
use codex_env_api::v1::{
    BulkDeleteResultDto, BulkUpdateResultDto, CreatedEnvironmentDto, EnvironmentRowDto,
    GatewayResultDto, result_to_gateway_result, row_from_record,
};
use codex_env_domain::{EnvironmentId, EnvironmentPatch, NewEnvironment};
use codex_env_ports::{EnvironmentStorePort, LoggerPort};
use codex_env_shared::RequestContext;
use std::sync::Arc;

/// Dependencies required by the gateway use cases.
#[derive(Clone)]
pub struct EnvironmentGatewayDeps {
    /// Backend tables.
    pub store: Arc<dyn EnvironmentStorePort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Gateway calls that report failure as data.
#[derive(Clone)]
pub struct EnvironmentGateway {
    deps: EnvironmentGatewayDeps,
}

impl EnvironmentGateway {
    /// Wrap a set of dependencies.
    #[must_use]
    pub const fn new(deps: EnvironmentGatewayDeps) -> Self {
        Self { deps }
    }

    /// Underlying dependencies, for calling the use cases directly.
    #[must_use]
    pub const fn deps(&self) -> &EnvironmentGatewayDeps {
        &self.deps
    }

    /// Create one environment with its variables.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        environment: NewEnvironment,
    ) -> GatewayResultDto<CreatedEnvironmentDto> {
        let result = create_environment(ctx, &self.deps, environment).await;
        result_to_gateway_result(result.map(|id| CreatedEnvironmentDto {
            id: id.as_str().to_string(),
        }))
    }

    /// Update one environment and return the stored row.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
        patch: EnvironmentPatch,
    ) -> GatewayResultDto<EnvironmentRowDto> {
        let result = update_environment(ctx, &self.deps, UpdateEnvironmentInput { id, patch }).await;
        result_to_gateway_result(result.map(|record| row_from_record(&record)))
    }

    /// Apply one partial update to many environments.
    pub async fn bulk_update(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
        patch: EnvironmentPatch,
    ) -> GatewayResultDto<BulkUpdateResultDto> {
        let result = bulk_update_environments(ctx, &self.deps, BulkUpdateInput { ids, patch }).await;
        result_to_gateway_result(result.map(|output| BulkUpdateResultDto {
            updated_count: output.updated_count,
            applied_fields: output
                .applied_fields
                .iter()
                .map(|field| field.column().to_string())
                .collect(),
        }))
    }

    /// Delete many environments.
    pub async fn bulk_delete(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
    ) -> GatewayResultDto<BulkDeleteResultDto> {
        let result = bulk_delete_environments(ctx, &self.deps, ids).await;
        result_to_gateway_result(result.map(|output| BulkDeleteResultDto {
            deleted_count: output.deleted_count,
        }))
    }

    /// Fetch one environment; `data: null` when it does not exist.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> GatewayResultDto<Option<EnvironmentRowDto>> {
        let result = get_environment(ctx, &self.deps, id).await;
        result_to_gateway_result(result.map(|found| found.as_ref().map(row_from_record)))
    }

    /// Fetch every environment, newest first.
    pub async fn list(&self, ctx: &RequestContext) -> GatewayResultDto<Vec<EnvironmentRowDto>> {
        let result = list_environments(ctx, &self.deps).await;
        result_to_gateway_result(result.map(|listing| listing_rows(&listing)))
    }
}

/// Rows as wire DTOs, for hosts that render JSON.
#[must_use]
pub fn listing_rows(listing: &EnvironmentListing) -> Vec<EnvironmentRowDto> {
    listing.environments.iter().map(row_from_record).collect()
}
