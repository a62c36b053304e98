//! Validation traits for form payloads and request DTOs.

/// Trait for validation errors used by `Validate`.
///
/// The derive macro only ever calls these constructors, so a type that
/// implements them can be the error of any derived `Validate` impl.
pub trait ValidationError: Sized {
    /// A required field was empty (after trimming).
    fn empty(field: &'static str) -> Self;

    /// A field value is invalid for a specific reason.
    fn invalid(field: &'static str, reason: &'static str) -> Self;

    /// A text field exceeds its maximum length in characters.
    fn too_long(field: &'static str, max: usize, actual: usize) -> Self;
}

/// Validate a payload using compile-time derived rules.
pub trait Validate {
    /// Error type returned by validation.
    type Error: ValidationError;

    /// Validate the payload, stopping at the first violation.
    fn validate(&self) -> Result<(), Self::Error>;
}
