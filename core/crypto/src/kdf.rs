//! Password hashing using Argon2id.
//!
//! Argon2id is a memory-hard password hashing function that provides
//! resistance to both GPU and time-memory trade-off attacks. Hashes are
//! stored as PHC strings so that the salt and cost parameters travel with
//! the hash and verification never depends on the current configuration.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use lockbox_common::{Error, Result};

/// Parameters for Argon2id password hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Create parameters suitable for interactive use.
    ///
    /// These parameters provide a balance between security and usability,
    /// targeting approximately 0.5-1 second of hashing time.
    pub fn interactive() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Create parameters suitable for sensitive data.
    ///
    /// Higher security parameters that may take several seconds.
    pub fn sensitive() -> Self {
        Self {
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Create moderate parameters for small servers.
    pub fn moderate() -> Self {
        Self {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Resolve a preset by name.
    pub fn from_preset(name: &str) -> Result<Self> {
        match name {
            "interactive" => Ok(Self::interactive()),
            "moderate" => Ok(Self::moderate()),
            "sensitive" => Ok(Self::sensitive()),
            _ => Err(Error::InvalidInput(format!(
                "Unknown KDF preset '{}'. Use: interactive, moderate, or sensitive",
                name
            ))),
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// One-way, salted password hashing primitive.
///
/// Implementations must salt every hash independently and compare in
/// constant time inside [`verify`](CredentialHasher::verify).
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing string.
    ///
    /// # Errors
    /// - Returns error if the parameters are invalid or hashing fails
    fn hash(&self, password: &[u8]) -> Result<String>;

    /// Check a plaintext password against a stored hash.
    ///
    /// # Returns
    /// - `Ok(true)` if the password matches
    /// - `Ok(false)` if it does not
    /// - `Err(_)` if the stored hash is unreadable
    fn verify(&self, password: &[u8], hash: &str) -> Result<bool>;
}

/// Argon2id implementation of [`CredentialHasher`].
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: KdfParams,
}

impl Argon2Hasher {
    /// Create a hasher producing hashes with the given cost parameters.
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            None,
        )
        .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &[u8]) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password, &salt)
            .map_err(|e| Error::Crypto(format!("Password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &[u8], hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::Crypto(format!("Stored hash is malformed: {}", e)))?;

        // Parameters are read from the PHC string, not from self.
        match Argon2::default().verify_password(password, &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Crypto(format!("Password verification failed: {}", e))),
        }
    }
}
