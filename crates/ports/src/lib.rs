//! # codex-env-ports
//!
//! Port traits for the codex-environments hexagonal architecture.
//!
//! This crate defines the interfaces between the use cases and the outside
//! world: the hosted backend tables, the toast collaborator, and structured
//! logging. It depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
///
/// Port calls are network round trips; one box per call.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod logger;
pub mod notifier;
pub mod store;

pub use logger::*;
pub use notifier::*;
pub use store::*;

// Re-export domain types used in port signatures, so adapter crates can
// implement ports without directly depending on `codex-env-domain`.
pub use codex_env_domain::{
    EnvironmentField, EnvironmentId, EnvironmentPatch, EnvironmentRecord, EnvironmentVariable,
    NewEnvironment, PatchValue,
};
