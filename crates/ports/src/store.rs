//! Environment store boundary contract.
//!
//! Mirrors the two backend tables: `environments` and
//! `environment_variables`. Implementations perform exactly one request per
//! call and never retry.

use crate::BoxFuture;
use codex_env_domain::{
    EnvironmentId, EnvironmentPatch, EnvironmentRecord, EnvironmentVariable, NewEnvironment,
};
use codex_env_shared::{RequestContext, Result};

/// Boundary contract for environment persistence.
pub trait EnvironmentStorePort: Send + Sync {
    /// Insert one `environments` row and return its id.
    ///
    /// Only the row columns are written; `environment.variables` is ignored.
    fn insert_environment(
        &self,
        ctx: &RequestContext,
        environment: NewEnvironment,
    ) -> BoxFuture<'_, Result<EnvironmentId>>;

    /// Insert `environment_variables` rows owned by `environment_id`.
    fn insert_variables(
        &self,
        ctx: &RequestContext,
        environment_id: EnvironmentId,
        variables: Vec<EnvironmentVariable>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Update the row with `id` and return it.
    ///
    /// Fails with `store:not_found` when no row matched.
    fn update_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<EnvironmentRecord>>;

    /// Update every row whose id is in `ids`. Unknown ids are ignored.
    fn update_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<()>>;

    /// Delete the row with `id`.
    fn delete_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<()>>;

    /// Delete every row whose id is in `ids`. Unknown ids are ignored.
    fn delete_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Fetch one row; `None` when it does not exist.
    fn get_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<Option<EnvironmentRecord>>>;

    /// Fetch all rows, newest first.
    fn list_environments(
        &self,
        ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<EnvironmentRecord>>>;
}
