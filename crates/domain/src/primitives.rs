//! Domain primitives with validated constructors.

use codex_env_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message shown when a variable key fails the key format.
pub const VARIABLE_KEY_FORMAT_MESSAGE: &str =
    "Keys must start with a letter and use only A-Z, 0-9, and underscores.";

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitiveError {
    /// `EnvironmentId` is empty after trimming.
    #[error("EnvironmentId must be non-empty")]
    InvalidEnvironmentId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `VariableName` is empty after trimming.
    #[error("Environment variables and secrets require both a key and value.")]
    EmptyVariableName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `VariableName` violates `^[A-Z][A-Z0-9_]*$`.
    #[error("Keys must start with a letter and use only A-Z, 0-9, and underscores.")]
    InvalidVariableName {
        /// Trimmed (and uppercased, when normalized) name that failed.
        input: String,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidEnvironmentId { .. } => ErrorCode::invalid_input(),
            Self::EmptyVariableName { .. } => ErrorCode::variable_incomplete(),
            Self::InvalidVariableName { .. } => ErrorCode::variable_key_format(),
        }
    }
}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PrimitiveError::InvalidEnvironmentId { input_length }
            | PrimitiveError::EmptyVariableName { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
            PrimitiveError::InvalidVariableName { input } => envelope.with_metadata("input", input),
        }
    }
}

/// Opaque identifier of a stored environment row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(Box<str>);

impl EnvironmentId {
    /// Parse an `EnvironmentId` from backend or caller input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::InvalidEnvironmentId {
                input_length: raw.len(),
            });
        };

        Ok(Self(trimmed.into()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the underlying string.
    #[must_use]
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl AsRef<str> for EnvironmentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Name of an environment variable or secret, always `^[A-Z][A-Z0-9_]*$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VariableName(Box<str>);

impl VariableName {
    /// Parse an already-normalized name. No case folding happens here.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyVariableName {
                input_length: raw.len(),
            });
        };

        if !is_valid_variable_name(trimmed) {
            return Err(PrimitiveError::InvalidVariableName {
                input: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.into()))
    }

    /// Trim and uppercase a user-typed key, then parse it.
    pub fn normalize(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        Self::parse(input.as_ref().trim().to_uppercase())
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for VariableName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for VariableName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn is_valid_variable_name(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_uppercase() {
        return false;
    }
    chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn environment_id_requires_non_empty_input() {
        let error = EnvironmentId::parse("   ").err();
        assert!(matches!(
            error,
            Some(PrimitiveError::InvalidEnvironmentId { input_length: 3 })
        ));
    }

    #[test]
    fn environment_id_is_trimmed() -> Result<(), PrimitiveError> {
        let id = EnvironmentId::parse("  7f3a  ")?;
        assert_eq!(id.as_str(), "7f3a");
        Ok(())
    }

    #[test]
    fn variable_name_parse_does_not_fold_case() {
        let error = VariableName::parse("api_key").err();
        assert!(matches!(
            error,
            Some(PrimitiveError::InvalidVariableName { ref input }) if input == "api_key"
        ));
    }

    #[test]
    fn variable_name_normalize_uppercases() -> Result<(), PrimitiveError> {
        let name = VariableName::normalize("  api_key ")?;
        assert_eq!(name.as_str(), "API_KEY");
        Ok(())
    }

    #[test]
    fn variable_name_rejects_leading_digit_and_symbols() {
        assert!(VariableName::normalize("1KEY").is_err());
        assert!(VariableName::normalize("_KEY").is_err());
        assert!(VariableName::normalize("MY-KEY").is_err());
        assert!(VariableName::normalize("MY KEY").is_err());
    }

    #[test]
    fn variable_name_errors_map_to_validation_codes() {
        let envelope: ErrorEnvelope = PrimitiveError::InvalidVariableName {
            input: "9X".to_owned(),
        }
        .into();
        assert_eq!(envelope.code, ErrorCode::variable_key_format());
        assert_eq!(envelope.message, VARIABLE_KEY_FORMAT_MESSAGE);
        assert_eq!(envelope.metadata.get("input").map(String::as_str), Some("9X"));
    }

    #[test]
    fn variable_name_deserialize_validates() {
        let parsed: Result<VariableName, _> = serde_json::from_str("\"lower\"");
        assert!(parsed.is_err());
        let parsed: Result<VariableName, _> = serde_json::from_str("\"UPPER_1\"");
        assert!(parsed.is_ok());
    }

    proptest! {
        #[test]
        fn variable_name_accepts_valid_inputs(name in valid_variable_name()) {
            prop_assert!(VariableName::parse(&name).is_ok());
        }

        #[test]
        fn normalized_names_are_uppercase(name in "[a-zA-Z][a-zA-Z0-9_]{0,20}") {
            let normalized = VariableName::normalize(&name);
            prop_assert!(normalized.is_ok());
            if let Ok(normalized) = normalized {
                prop_assert_eq!(normalized.as_str(), name.to_uppercase());
            }
        }

        #[test]
        fn names_with_a_leading_non_letter_are_rejected(name in "[0-9_][A-Z0-9_]{0,10}") {
            prop_assert!(VariableName::parse(&name).is_err());
        }
    }

    fn valid_variable_name() -> impl Strategy<Value = String> {
        let start = prop::sample::select(('A'..='Z').collect::<Vec<char>>());
        let mut rest_chars: Vec<char> = ('A'..='Z').chain('0'..='9').collect();
        rest_chars.push('_');
        let rest = prop::collection::vec(prop::sample::select(rest_chars), 0..24);

        (start, rest).prop_map(|(start, rest)| std::iter::once(start).chain(rest).collect())
    }
}
