//! Request and response bodies exchanged between server and client.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{base64_bytes, Record, RecordId, Username};

/// Body of register and login requests.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub username: Username,
    pub password: String,
}

impl fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Session token returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Identifier assigned to a stored record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreResponse {
    pub id: RecordId,
}

/// Body of an update request.
#[derive(Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub meta: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Records owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub records: Vec<Record>,
}

/// Error body returned with every non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// An [`ErrorKind`](crate::ErrorKind) code, or `BAD_REQUEST` for
    /// requests rejected before reaching the handler.
    pub code: String,
    pub message: String,
}

/// Code used for malformed requests.
pub const BAD_REQUEST_CODE: &str = "BAD_REQUEST";
