//! Secret detection and redaction utilities.
//!
//! Environment variable values are carried as [`SecretString`] from the
//! form all the way to the store request body, so a stray `{:?}` in a log
//! line never prints a value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a variable name likely refers to a secret.
///
/// Case-insensitive substring match on common naming conventions.
///
/// # Examples
///
/// ```
/// use codex_env_shared::is_secret_key;
///
/// assert!(is_secret_key("STRIPE_API_KEY"));
/// assert!(is_secret_key("db_password"));
/// assert!(!is_secret_key("NODE_ENV"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    ["KEY", "TOKEN", "SECRET", "PASSWORD", "CREDENTIAL", "AUTH"]
        .iter()
        .any(|needle| key.contains(needle))
}

/// Redacts a value if the key is likely a secret.
///
/// # Examples
///
/// ```
/// use codex_env_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("GITHUB_TOKEN", "ghp_123"), "[REDACTED]");
/// assert_eq!(redact_if_secret("RUST_LOG", "debug"), "debug");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A string wrapper that redacts on Display/Debug.
///
/// Serializes to the plain value: the store must receive what the user typed.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true when the wrapped value is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume and return the underlying secret.
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl AsRef<str> for SecretString {
    fn as_ref(&self) -> &str {
        self.expose()
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(Box::from(value))
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_secret_patterns() {
        assert!(is_secret_key("OPENAI_API_KEY"));
        assert!(is_secret_key("NPM_TOKEN"));
        assert!(is_secret_key("CLIENT_SECRET"));
        assert!(is_secret_key("PGPASSWORD"));
        assert!(is_secret_key("GCP_CREDENTIALS"));
        assert!(is_secret_key("basic_auth"));
    }

    #[test]
    fn rejects_non_secret_patterns() {
        assert!(!is_secret_key("NODE_ENV"));
        assert!(!is_secret_key("PORT"));
        assert!(!is_secret_key("DATABASE_URL"));
        assert!(!is_secret_key("PYTHONPATH"));
    }

    #[test]
    fn redacts_only_secret_values() {
        assert_eq!(redact_if_secret("API_KEY", "sk-123456"), REDACTED);
        assert_eq!(redact_if_secret("PORT", "8080"), "8080");
    }

    #[test]
    fn secret_string_hides_value_in_formatting() {
        let secret = SecretString::new("shh");
        assert_eq!(secret.to_string(), REDACTED);
        assert_eq!(format!("{secret:?}"), REDACTED);
        assert_eq!(secret.expose(), "shh");
    }

    #[test]
    fn secret_string_serializes_plain_value() -> Result<(), serde_json::Error> {
        let secret = SecretString::from("hunter2");
        assert_eq!(serde_json::to_string(&secret)?, "\"hunter2\"");
        let back: SecretString = serde_json::from_str("\"hunter2\"")?;
        assert_eq!(back, secret);
        Ok(())
    }
}
