//! Outcome kinds reported to remote callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Classified failure of a vault operation.
///
/// This is the complete set of failures a caller can observe. Callers must
/// branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing, malformed, expired or mis-signed token, or wrong credentials.
    Unauthenticated,
    /// Registration of a username that already exists.
    Conflict,
    /// Valid caller that does not own the target record.
    AccessDenied,
    /// Target record does not exist.
    NotFound,
    /// Any unclassified collaborator failure.
    Internal,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Unauthenticated,
        ErrorKind::Conflict,
        ErrorKind::AccessDenied,
        ErrorKind::NotFound,
        ErrorKind::Internal,
    ];

    /// Stable wire code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::AccessDenied => "ACCESS_DENIED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Short human-readable message safe to show to any caller.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Conflict => "username already taken",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::NotFound => "not found",
            ErrorKind::Internal => "internal server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ErrorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.code() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown error code: {}", s)))
    }
}
