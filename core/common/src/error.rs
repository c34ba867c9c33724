//! Common error types for Lockbox collaborators.
//!
//! These errors are produced by stores and cryptographic primitives. They are
//! never shown to a remote caller directly; the request handler classifies
//! each one into an [`ErrorKind`](crate::ErrorKind) first.

use thiserror::Error;

/// Error type for collaborator operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
