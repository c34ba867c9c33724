//! Typed payloads for the structured record kinds.
//!
//! The server treats record data as opaque bytes. Clients encode login and
//! card records as JSON objects with the shapes below.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Login/password pair stored in a `LOGIN` record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub login: String,
    pub password: String,
}

/// Bank card stored in a `CARD` record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPayload {
    pub number: String,
    /// Expiry date as printed on the card (e.g. `08/27`).
    pub date: String,
    pub cvv: String,
}

macro_rules! json_payload {
    ($ty:ty) => {
        impl $ty {
            /// Encode as record data.
            pub fn to_bytes(&self) -> Result<Vec<u8>> {
                serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
            }

            /// Decode from record data.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    };
}

json_payload!(LoginPayload);
json_payload!(CardPayload);

impl fmt::Debug for LoginPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginPayload")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for CardPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardPayload")
            .field("number", &"[REDACTED]")
            .field("date", &self.date)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_payload_shape() {
        let payload = LoginPayload {
            login: "x".to_string(),
            password: "y".to_string(),
        };
        let bytes = payload.to_bytes().unwrap();
        assert_eq!(bytes, br#"{"login":"x","password":"y"}"#);
    }

    #[test]
    fn test_card_payload_from_bytes() {
        let card = CardPayload::from_bytes(br#"{"number":"4111","date":"08/27","cvv":"123"}"#)
            .unwrap();
        assert_eq!(card.number, "4111");
        assert_eq!(card.cvv, "123");
    }

    #[test]
    fn test_malformed_payload_fails() {
        assert!(LoginPayload::from_bytes(b"not json").is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let payload = LoginPayload {
            login: "x".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", payload).contains("hunter2"));
    }
}
