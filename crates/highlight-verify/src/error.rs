//! Error types for signature verification.

use thiserror::Error;

/// Why a signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("recovered signer does not match")]
    EcdsaMismatch,

    #[error("contract wallet rejected the signature")]
    Eip1271Rejected,

    #[error("account contract rejected the signature")]
    Snip6Rejected,

    #[error("account contract is not deployed")]
    ContractNotDeployed,

    #[error("no rpc provider for chain {0}")]
    NoProvider(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("invalid signer: {0}")]
    InvalidSigner(String),

    #[error("message does not match its schema: {0}")]
    InvalidTypedData(String),
}

/// Errors raised by the chain RPC transport.
#[derive(Debug, Error)]
pub enum RpcError {
    /// HTTP transport failure or timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with something that is not a JSON-RPC reply.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors that can occur while verifying an envelope.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// No strategy validated the signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] Rejection),

    /// The RPC provider could not be reached.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),
}

/// Result type for verification.
pub type Result<T> = std::result::Result<T, VerifyError>;
