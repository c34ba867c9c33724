//! Client-side errors.

use thiserror::Error;

use lockbox_common::ErrorKind;

/// Failure of a client call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server classified the request as failed.
    #[error("{kind}: {message}")]
    Rejected { kind: ErrorKind, message: String },

    /// The server could not decode the request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No session token is held.
    #[error("Not logged in")]
    NoSession,

    /// Connection or protocol failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server's response could not be understood.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Kind reported by the server, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type for client calls.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
