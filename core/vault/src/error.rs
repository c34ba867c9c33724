//! Error taxonomy for vault operations.
//!
//! Every collaborator failure is classified into exactly one [`VaultError`]
//! before it leaves the request handler. The cause of an internal failure is
//! logged here and kept for diagnostics, but [`VaultError::user_message`]
//! never includes it.

use std::fmt::Display;
use thiserror::Error;
use tracing::error;

use lockbox_common::ErrorKind;
use lockbox_crypto::TokenFault;

/// Failure of the Session Authority.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Token is malformed, mis-signed or expired.
    #[error("invalid token: {0}")]
    InvalidToken(TokenFault),

    /// Token could not be produced.
    #[error("token issuance failed: {0}")]
    Signing(String),
}

/// Classified outcome of a failed vault operation.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Bad token or bad credentials.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Username already registered.
    #[error("username already taken")]
    Conflict,

    /// Caller does not own the record.
    #[error("access denied")]
    AccessDenied,

    /// Record does not exist.
    #[error("not found")]
    NotFound,

    /// Unclassified collaborator failure. The string is for server logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Classify an unexpected collaborator failure, logging its cause.
    pub fn internal(operation: &str, cause: impl Display) -> Self {
        error!(operation, error = %cause, "Collaborator failure");
        VaultError::Internal(format!("{}: {}", operation, cause))
    }

    /// Kind reported to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Unauthenticated => ErrorKind::Unauthenticated,
            VaultError::Conflict => ErrorKind::Conflict,
            VaultError::AccessDenied => ErrorKind::AccessDenied,
            VaultError::NotFound => ErrorKind::NotFound,
            VaultError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to the caller.
    pub fn user_message(&self) -> &'static str {
        self.kind().message()
    }
}
