//! Authentication configuration and time source.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

use lockbox_crypto::SigningSecret;

/// Default session token validity window (12 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Settings for the Session Authority.
///
/// Read-only once the authority is constructed.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric secret for signing tokens.
    pub secret: SigningSecret,
    /// How long an issued token stays valid.
    pub token_ttl: Duration,
}

impl AuthConfig {
    /// Create a configuration with the default validity window.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Set the token validity window.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

/// Source of the current time for token issuance and expiry checks.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Useful for testing expiry.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
