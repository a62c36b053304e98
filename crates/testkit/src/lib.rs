//! # codex-env-testkit
//!
//! Test doubles and in-memory adapters.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod errors;
pub mod in_memory;

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_env_ports::ports_crate_version;
    use codex_env_shared::shared_crate_version;

    #[test]
    fn testkit_can_use_ports_and_shared() {
        assert!(!testkit_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn error_fixtures_are_available() {
        let codes = errors::common_error_codes();
        assert!(codes.iter().any(|code| code.namespace() == "store"));
    }
}
