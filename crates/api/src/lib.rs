//! # codex-env-api
//!
//! Wire data transfer objects: rows of the two backend tables, the request
//! payloads the gateway accepts, and the discriminated result it returns.
//! This crate depends only on `domain` and `shared`.

/// API v1 DTOs.
pub mod v1;

/// Returns the api crate version.
#[must_use]
pub const fn api_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_env_domain::domain_crate_version;
    use codex_env_shared::shared_crate_version;

    #[test]
    fn api_can_use_domain_and_shared() {
        assert!(!api_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
