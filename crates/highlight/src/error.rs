//! Error types for the Highlight ledger.

use highlight_core::TypedDataError;
use highlight_store::AdapterError;
use highlight_verify::VerifyError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
///
/// Every variant aborts the current message with no state change.
#[derive(Debug, Error)]
pub enum HighlightError {
    /// No agent is registered at the envelope's `verifyingContract`.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// The agent does not accept this `primaryType`.
    #[error("Entrypoint not found: {0}")]
    EntrypointNotFound(String),

    /// The entrypoint exists but no handler is bound to it.
    #[error("Handler not found: {0}")]
    HandlerNotFound(String),

    #[error("Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("Salt already used")]
    SaltAlreadyUsed,

    /// A business rule checked by an agent handler failed.
    #[error("{0}")]
    Assertion(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(u64),

    /// The envelope is structurally unusable.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("typed data error: {0}")]
    TypedData(#[from] TypedDataError),

    #[error("storage error: {0}")]
    Store(#[from] AdapterError),

    /// Chain RPC failure while verifying a signature.
    #[error("verification error: {0}")]
    Verify(VerifyError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl HighlightError {
    /// Stable machine-readable name of the error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_) => "AgentNotFound",
            Self::EntrypointNotFound(_) => "EntrypointNotFound",
            Self::HandlerNotFound(_) => "HandlerNotFound",
            Self::InvalidSignature { .. } => "InvalidSignature",
            Self::SaltAlreadyUsed => "SaltAlreadyUsed",
            Self::Assertion(_) => "Assertion",
            Self::UnitNotFound(_) => "UnitNotFound",
            Self::InvalidMessage(_) => "InvalidMessage",
            Self::TypedData(_) => "TypedData",
            Self::Store(_) => "Store",
            Self::Verify(_) => "Verify",
            Self::Serialization(_) => "Serialization",
            Self::Config(_) => "Config",
        }
    }
}

impl From<VerifyError> for HighlightError {
    fn from(error: VerifyError) -> Self {
        match error {
            VerifyError::InvalidSignature(rejection) => Self::InvalidSignature {
                reason: rejection.to_string(),
            },
            other => Self::Verify(other),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, HighlightError>;
