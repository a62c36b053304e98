//! # codex-env-app
//!
//! Environment form workflows: the form state controller, the transform
//! stage, the persistence gateway use cases, the submit boundary, and list
//! selection.
//!
//! This crate depends on `ports`, `domain`, `shared`, and `api` (for the
//! gateway result DTO).

pub mod bulk_delete_environments;
pub mod bulk_update_environments;
pub mod create_environment;
pub mod environment_queries;
pub mod form_state;
pub mod gateway;
mod operation_log;
pub mod selection;
pub mod submit;
pub mod transform;
pub mod update_environment;

pub use bulk_delete_environments::{BulkDeleteOutput, bulk_delete_environments};
pub use bulk_update_environments::{BulkUpdateInput, BulkUpdateOutput, bulk_update_environments};
pub use create_environment::create_environment;
pub use environment_queries::{EnvironmentListing, get_environment, list_environments};
pub use form_state::{
    DraftRow, EnvironmentForm, FormAction, FormSnapshot, RowId, RowList, RowPart, SelectOption,
    container_image_options, version_options,
};
pub use gateway::{EnvironmentGateway, EnvironmentGatewayDeps, listing_rows};
pub use selection::{
    EditTarget, EnvironmentPicker, EnvironmentSelection, PICKER_EMPTY_MESSAGE,
    PICKER_NEW_ENVIRONMENT, PICKER_PLACEHOLDER, PICKER_SEARCH_PLACEHOLDER, PickerOption, Route,
};
pub use submit::{INVALID_INPUT_MESSAGE, SubmitBoundary, SubmitOutcome};
pub use transform::{
    patch_from_new_environment, strip_untouched, to_bulk_patch, to_new_environment,
    to_update_patch,
};
pub use update_environment::{UpdateEnvironmentInput, update_environment};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_env_api::api_crate_version;
    use codex_env_domain::domain_crate_version;
    use codex_env_ports::ports_crate_version;
    use codex_env_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                continue;
            }
            if in_deps && line.starts_with("codex-env-") {
                let key = line.split('=').next().unwrap_or("").trim();
                deps.push(key.split('.').next().unwrap_or("").trim().to_string());
            }
        }

        deps
    }

    #[test]
    fn app_never_depends_on_adapters_or_infra() {
        let allowed = [
            "codex-env-api",
            "codex-env-domain",
            "codex-env-ports",
            "codex-env-shared",
        ];
        for dep in workspace_deps() {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }
    }

    #[test]
    fn app_can_use_ports_domain_shared_api() {
        assert!(!app_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
        assert!(!api_crate_version().is_empty());
    }
}
