//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::ServerError;
use lockbox_crypto::{Argon2Hasher, KdfParams, SigningSecret};
use lockbox_storage::StoreBackend;
use lockbox_vault::{AuthConfig, RequestHandler, SessionAuthority, DEFAULT_TOKEN_TTL};

/// Default listen address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:3200";

/// Default database location.
pub const DEFAULT_DATABASE: &str = "lockbox.db";

/// Settings for a Lockbox server process.
///
/// The signing secret is deliberately not part of this structure so that it
/// never lands in a configuration file by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub listen_addr: String,
    /// SQLite database path, or `:memory:`.
    pub database: String,
    /// Session token validity window in seconds.
    pub token_ttl_secs: u64,
    /// Password hashing cost.
    pub kdf: KdfParams,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDRESS.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL.as_secs(),
            kdf: KdfParams::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ServerError> {
        serde_json::from_str(json).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String, ServerError> {
        serde_json::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Token validity window.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Open the stores and assemble the request handler.
    ///
    /// # Errors
    /// - Token lifetime is zero
    /// - Database cannot be opened
    pub fn build_handler(&self, secret: SigningSecret) -> Result<RequestHandler, ServerError> {
        if self.token_ttl_secs == 0 {
            return Err(ServerError::Config(
                "token_ttl_secs must be greater than zero".to_string(),
            ));
        }

        let stores = StoreBackend::from_location(&self.database).open()?;
        let authority = Arc::new(SessionAuthority::new(
            AuthConfig::new(secret).with_token_ttl(self.token_ttl()),
        ));
        let hasher = Arc::new(Argon2Hasher::new(self.kdf.clone()));

        info!(
            database = %self.database,
            token_ttl_secs = self.token_ttl_secs,
            "Request handler ready"
        );
        Ok(RequestHandler::new(stores, hasher, authority))
    }
}
