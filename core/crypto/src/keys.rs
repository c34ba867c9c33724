//! Key types with secure memory handling.
//!
//! The signing secret is zeroized on drop to prevent it from persisting in
//! memory after the server shuts down.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use lockbox_common::{Error, Result};

/// Length of generated signing secrets in bytes (256-bit).
pub const SECRET_LENGTH: usize = 32;

/// Symmetric secret used to sign and verify session tokens.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret {
    key: Vec<u8>,
}

impl SigningSecret {
    /// Create a signing secret from raw bytes.
    ///
    /// # Errors
    /// - Returns error if `key` is empty
    pub fn from_bytes(key: Vec<u8>) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::InvalidInput(
                "Signing secret cannot be empty".to_string(),
            ));
        }
        Ok(Self { key })
    }

    /// Generate a random secret.
    pub fn generate() -> Self {
        let mut key = vec![0u8; SECRET_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED])")
    }
}
