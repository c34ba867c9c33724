//! Common types used throughout Lockbox.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Name of a registered user.
///
/// Usernames are case-sensitive and immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a new Username from a string.
    ///
    /// # Errors
    /// - Returns error if the name is empty
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Username cannot be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wrap a raw identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw identifier.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared type of a record.
///
/// Purely descriptive: the core never checks `data` against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    /// Login/password pair.
    Login,
    /// Free text.
    Text,
    /// Bank card data.
    Card,
    /// Arbitrary binary blob.
    Binary,
}

impl RecordKind {
    /// Stable name used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Login => "LOGIN",
            RecordKind::Text => "TEXT",
            RecordKind::Card => "CARD",
            RecordKind::Binary => "BINARY",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LOGIN" => Ok(RecordKind::Login),
            "TEXT" => Ok(RecordKind::Text),
            "CARD" => Ok(RecordKind::Card),
            "BINARY" => Ok(RecordKind::Binary),
            _ => Err(crate::Error::InvalidInput(format!(
                "Unknown record kind: {}",
                s
            ))),
        }
    }
}

/// Record contents supplied by a caller on creation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Declared type.
    pub kind: RecordKind,
    /// Opaque payload.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Short description.
    pub meta: String,
}

impl fmt::Debug for NewRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewRecord")
            .field("kind", &self.kind)
            .field("data", &format_args!("[REDACTED; {} bytes]", self.data.len()))
            .field("meta", &self.meta)
            .finish()
    }
}

/// A stored secret entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Server-assigned identifier.
    pub id: RecordId,
    /// Declared type, fixed at creation.
    pub kind: RecordKind,
    /// Opaque payload.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Short description.
    pub meta: String,
    /// User that created the record.
    pub owner: Username,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("data", &format_args!("[REDACTED; {} bytes]", self.data.len()))
            .field("meta", &self.meta)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Serde helpers encoding byte payloads as standard base64 strings.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize bytes from a base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<String> for SensitiveBytes {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_creation() {
        let name = Username::new("alice").unwrap();
        assert_eq!(name.as_str(), "alice");
    }

    #[test]
    fn test_username_empty_fails() {
        assert!(Username::new("").is_err());
        assert!(serde_json::from_str::<Username>("\"\"").is_err());
    }

    #[test]
    fn test_username_is_case_sensitive() {
        assert_ne!(Username::new("Alice").unwrap(), Username::new("alice").unwrap());
    }

    #[test]
    fn test_record_kind_parse() {
        assert_eq!("login".parse::<RecordKind>().unwrap(), RecordKind::Login);
        assert_eq!("BINARY".parse::<RecordKind>().unwrap(), RecordKind::Binary);
        assert!("photo".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_record_data_is_base64_on_the_wire() {
        let record = NewRecord {
            kind: RecordKind::Text,
            data: b"hello".to_vec(),
            meta: "note".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["data"], "aGVsbG8=");
        assert_eq!(json["kind"], "TEXT");
    }

    #[test]
    fn test_record_debug_redacts_data() {
        let record = Record {
            id: RecordId::new(7),
            kind: RecordKind::Login,
            data: b"hunter2".to_vec(),
            meta: "bank".to_string(),
            owner: Username::new("alice").unwrap(),
        };
        let debug = format!("{:?}", record);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_sensitive_bytes_from_string() {
        let secret = SensitiveBytes::from("pw-123".to_string());
        assert_eq!(secret.as_bytes(), b"pw-123");
    }

    #[test]
    fn test_sensitive_bytes_debug_redacted() {
        let secret = SensitiveBytes::from("password".to_string());
        assert_eq!(format!("{:?}", secret), "SensitiveBytes([REDACTED; 8 bytes])");
    }
}
