//! Environment variable rows and their normalization.
//!
//! Rows are checked in submission order:
//!
//! 1. both key and value blank after trimming: the row is dropped
//! 2. exactly one blank: rejected
//! 3. the trimmed key is uppercased; the value is stored trimmed
//! 4. the key must match `^[A-Z][A-Z0-9_]*$`
//! 5. a key already seen earlier in the submission is rejected

use crate::primitives::{PrimitiveError, VARIABLE_KEY_FORMAT_MESSAGE, VariableName};
use crate::validation::{FieldViolation, VARIABLE_INCOMPLETE_MESSAGE, ViolationRule};
use codex_env_shared::SecretString;
use std::collections::BTreeSet;

const VARIABLES_FIELD: &str = "environment_variables";

/// A raw key/value row as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariableRow {
    /// Key as typed.
    pub key: String,
    /// Value as typed.
    pub value: String,
}

impl VariableRow {
    /// Build a row.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Both key and value are blank after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.key.trim().is_empty() && self.value.trim().is_empty()
    }
}

/// A normalized variable, ready for the `environment_variables` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentVariable {
    name: VariableName,
    value: SecretString,
    is_secret: bool,
}

impl EnvironmentVariable {
    /// Build a variable from already-normalized parts.
    #[must_use]
    pub const fn new(name: VariableName, value: SecretString, is_secret: bool) -> Self {
        Self {
            name,
            value,
            is_secret,
        }
    }

    /// Uppercased name.
    #[must_use]
    pub const fn name(&self) -> &VariableName {
        &self.name
    }

    /// Value, redacted in `Debug`.
    #[must_use]
    pub const fn value(&self) -> &SecretString {
        &self.value
    }

    /// True for secrets, false for plain variables.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        self.is_secret
    }
}

fn duplicate_key(name: &VariableName) -> FieldViolation {
    FieldViolation::new(
        VARIABLES_FIELD,
        ViolationRule::VariableDuplicateKey,
        format!("Duplicate key \"{name}\" detected."),
    )
}

fn normalize_row(row: &VariableRow, is_secret: bool) -> Result<Option<EnvironmentVariable>, FieldViolation> {
    if row.is_blank() {
        return Ok(None);
    }
    if row.key.trim().is_empty() || row.value.trim().is_empty() {
        return Err(FieldViolation::new(
            VARIABLES_FIELD,
            ViolationRule::VariableIncomplete,
            VARIABLE_INCOMPLETE_MESSAGE,
        ));
    }
    let name = VariableName::normalize(&row.key).map_err(|error| match error {
        PrimitiveError::InvalidVariableName { .. } => FieldViolation::new(
            VARIABLES_FIELD,
            ViolationRule::VariableKeyFormat,
            VARIABLE_KEY_FORMAT_MESSAGE,
        ),
        other => FieldViolation::new(
            VARIABLES_FIELD,
            ViolationRule::VariableIncomplete,
            other.to_string(),
        ),
    })?;
    Ok(Some(EnvironmentVariable::new(
        name,
        SecretString::from(row.value.trim()),
        is_secret,
    )))
}

/// Normalize plain variables then secrets into one ordered sequence.
///
/// Duplicate detection spans both lists. Values are kept as typed.
pub fn normalize_variables(
    variables: &[VariableRow],
    secrets: &[VariableRow],
) -> Result<Vec<EnvironmentVariable>, FieldViolation> {
    normalize_tagged_variables(
        variables
            .iter()
            .map(|row| (row, false))
            .chain(secrets.iter().map(|row| (row, true))),
    )
}

/// Normalize rows that already carry their secret flag, keeping their order.
pub fn normalize_tagged_variables<'a>(
    rows: impl IntoIterator<Item = (&'a VariableRow, bool)>,
) -> Result<Vec<EnvironmentVariable>, FieldViolation> {
    let mut seen = BTreeSet::new();
    let mut normalized = Vec::new();
    for (row, is_secret) in rows {
        let Some(variable) = normalize_row(row, is_secret)? else {
            continue;
        };
        if !seen.insert(variable.name.clone()) {
            return Err(duplicate_key(&variable.name));
        }
        normalized.push(variable);
    }
    Ok(normalized)
}

/// Invariants of an already-typed variable set: non-blank values, distinct names.
pub fn validate_variable_set(variables: &[EnvironmentVariable]) -> Result<(), FieldViolation> {
    let mut seen = BTreeSet::new();
    for variable in variables {
        if variable.value.expose().trim().is_empty() {
            return Err(FieldViolation::new(
                VARIABLES_FIELD,
                ViolationRule::VariableIncomplete,
                VARIABLE_INCOMPLETE_MESSAGE,
            ));
        }
        if !seen.insert(&variable.name) {
            return Err(duplicate_key(&variable.name));
        }
    }
    Ok(())
}
