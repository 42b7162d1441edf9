//! # Validation Errors
//!
//! Errors raised while turning untrusted client input into domain types.
//! Display strings are client-facing: the API returns them verbatim in 4xx
//! response bodies.

use thiserror::Error;

/// Validation failure for client-supplied input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No digest was supplied, or it was the empty string.
    #[error("Hash is required")]
    MissingDigest,

    /// The digest does not have exactly 64 characters.
    #[error("Hash must be exactly 64 hexadecimal characters (got {actual})")]
    InvalidDigestLength {
        /// Character count of the submitted value.
        actual: usize,
    },

    /// The digest contains a character outside `[0-9a-fA-F]`.
    #[error("Hash contains non-hexadecimal character {character:?} at position {position}")]
    InvalidDigestCharacter {
        /// Zero-based character position.
        position: usize,
        /// The offending character.
        character: char,
    },

    /// A free-text field exceeds the accepted length.
    #[error("{field} must not exceed {max} characters")]
    FieldTooLong {
        /// Wire name of the field.
        field: &'static str,
        /// Maximum accepted length.
        max: usize,
    },

    /// A required free-text field is missing or blank.
    #[error("{field} is required")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },
}
