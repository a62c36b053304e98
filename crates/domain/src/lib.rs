//! # codex-env-domain
//!
//! The environment schema: what a valid environment and its variables look
//! like, with no I/O.
//!
//! - **Primitives** - `EnvironmentId`, `VariableName`
//! - **Runtime** - `LanguageRuntime`, `VersionFormat`, `VersionPins`
//! - **Environment** - `EnvironmentRecord`, `NewEnvironment`, `EnvironmentPatch`
//! - **Variables** - `VariableRow`, `EnvironmentVariable`, `normalize_variables`
//! - **Validation** - `FieldViolation` and the field rules
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` (and the validation derive)
//! - No infrastructure or adapter dependencies

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use codex_env_shared::shared_crate_version;

pub mod environment;
pub mod primitives;
pub mod runtime;
pub mod validation;
pub mod variables;

pub use environment::{
    ContainerImage, EnvironmentField, EnvironmentPatch, EnvironmentRecord, NewEnvironment,
    PatchValue, SetupScript, SetupScriptMode,
};
pub use primitives::{EnvironmentId, PrimitiveError, VARIABLE_KEY_FORMAT_MESSAGE, VariableName};
pub use runtime::{LanguageRuntime, VersionFormat, VersionPins};
pub use validation::{
    DESCRIPTION_MAX_LEN, FieldViolation, NAME_MAX_LEN, SETUP_SCRIPT_REQUIRED_MESSAGE,
    VARIABLE_INCOMPLETE_MESSAGE, ViolationRule,
};
pub use variables::{
    EnvironmentVariable, VariableRow, normalize_tagged_variables, normalize_variables,
    validate_variable_set,
};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_depends_on_shared() {
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
