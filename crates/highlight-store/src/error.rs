//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Error from the Redis connection.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `incr` on a key holding a non-integer value.
    #[error("value at {0} is not an integer")]
    NotAnInteger(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding adapter state was poisoned.
    #[error("adapter lock poisoned")]
    Poisoned,

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
