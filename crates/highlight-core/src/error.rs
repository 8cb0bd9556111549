//! Error types for Highlight Core.

use thiserror::Error;

/// Errors raised while deriving, encoding or hashing typed data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypedDataError {
    #[error("missing primary type")]
    MissingPrimaryType,

    #[error("ambiguous primary types or unused types: {}", .0.join(", "))]
    AmbiguousPrimaryType(Vec<String>),

    #[error("circular type reference to {0}")]
    CircularReference(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("missing value for field {0}")]
    MissingField(String),

    #[error("invalid value for type {kind}: {reason}")]
    InvalidValue { kind: String, reason: String },
}

impl TypedDataError {
    pub fn invalid(kind: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for typed data operations.
pub type Result<T> = std::result::Result<T, TypedDataError>;
