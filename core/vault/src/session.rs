//! Session token issuance and verification.
//!
//! Tokens are stateless: a token is valid exactly when its signature matches
//! the configured secret and the clock has not passed its expiry. There is no
//! session table and no revocation.

use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

use crate::config::{AuthConfig, Clock, SystemClock};
use crate::error::SessionError;
use lockbox_common::Username;
use lockbox_crypto::{sign_claims, verify_signature, SessionClaims, TokenFault};

/// Issues and verifies signed, time-limited session tokens.
pub struct SessionAuthority {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
}

impl SessionAuthority {
    /// Create an authority using the wall clock.
    pub fn new(config: AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an authority with an explicit time source.
    pub fn with_clock(config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Issue a token for `username`, expiring one validity window from now.
    ///
    /// # Errors
    /// - `SessionError::Signing` if the window is out of range or signing fails
    pub fn issue(&self, username: &Username) -> Result<String, SessionError> {
        let ttl = Duration::from_std(self.config.token_ttl)
            .map_err(|e| SessionError::Signing(format!("Invalid token lifetime: {}", e)))?;
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| SessionError::Signing("Token expiry overflows".to_string()))?;

        let claims = SessionClaims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = sign_claims(&self.config.secret, &claims)
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        debug!(user = %username, expires_at = %expires_at, "Issued session token");
        Ok(token)
    }

    /// Verify a token and return the username it was issued to.
    ///
    /// No existence check is made against the credential store.
    ///
    /// # Errors
    /// - `SessionError::InvalidToken` if the signature does not match, the
    ///   payload is malformed, or the current time is past the expiry
    pub fn verify(&self, token: &str) -> Result<Username, SessionError> {
        let claims =
            verify_signature(&self.config.secret, token).map_err(SessionError::InvalidToken)?;

        if self.clock.now().timestamp() > claims.exp {
            return Err(SessionError::InvalidToken(TokenFault::Expired));
        }

        Username::new(claims.sub).map_err(|_| SessionError::InvalidToken(TokenFault::Malformed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManualClock;
    use chrono::{DateTime, Utc};
    use lockbox_crypto::SigningSecret;
    use proptest::prelude::*;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn secret(bytes: &[u8]) -> SigningSecret {
        SigningSecret::from_bytes(bytes.to_vec()).unwrap()
    }

    fn authority_with_clock(clock: Arc<ManualClock>) -> SessionAuthority {
        SessionAuthority::with_clock(AuthConfig::new(secret(b"test-secret")), clock)
    }

    fn alice() -> Username {
        Username::new("alice").unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let authority = SessionAuthority::new(AuthConfig::new(secret(b"test-secret")));
        let token = authority.issue(&alice()).unwrap();

        assert_eq!(authority.verify(&token).unwrap(), alice());
    }

    #[test]
    fn test_valid_until_expiry_instant() {
        let clock = Arc::new(ManualClock::new(start()));
        let authority = authority_with_clock(clock.clone());
        let token = authority.issue(&alice()).unwrap();

        clock.advance(Duration::hours(12));
        assert_eq!(authority.verify(&token).unwrap(), alice());

        clock.advance(Duration::seconds(1));
        assert!(matches!(
            authority.verify(&token),
            Err(SessionError::InvalidToken(TokenFault::Expired))
        ));
    }

    #[test]
    fn test_custom_ttl() {
        let clock = Arc::new(ManualClock::new(start()));
        let config = AuthConfig::new(secret(b"test-secret"))
            .with_token_ttl(std::time::Duration::from_secs(60));
        let authority = SessionAuthority::with_clock(config, clock.clone());
        let token = authority.issue(&alice()).unwrap();

        clock.advance(Duration::seconds(61));
        assert!(authority.verify(&token).is_err());
    }

    #[test]
    fn test_other_secret_rejected() {
        let issuer = SessionAuthority::new(AuthConfig::new(secret(b"secret-one")));
        let verifier = SessionAuthority::new(AuthConfig::new(secret(b"secret-two")));
        let token = issuer.issue(&alice()).unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(SessionError::InvalidToken(TokenFault::BadSignature))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let authority = SessionAuthority::new(AuthConfig::new(secret(b"test-secret")));
        assert!(matches!(
            authority.verify("garbage"),
            Err(SessionError::InvalidToken(TokenFault::Malformed))
        ));
        assert!(authority.verify("").is_err());
    }

    #[test]
    fn test_empty_subject_rejected() {
        let key = secret(b"test-secret");
        let authority = SessionAuthority::new(AuthConfig::new(key.clone()));
        let token = sign_claims(
            &key,
            &SessionClaims {
                sub: String::new(),
                iat: Utc::now().timestamp(),
                exp: Utc::now().timestamp() + 60,
            },
        )
        .unwrap();

        assert!(matches!(
            authority.verify(&token),
            Err(SessionError::InvalidToken(TokenFault::Malformed))
        ));
    }

    #[test]
    fn test_concurrent_tokens_for_one_user() {
        let clock = Arc::new(ManualClock::new(start()));
        let authority = authority_with_clock(clock.clone());

        let first = authority.issue(&alice()).unwrap();
        clock.advance(Duration::seconds(5));
        let second = authority.issue(&alice()).unwrap();

        assert_ne!(first, second);
        assert_eq!(authority.verify(&first).unwrap(), alice());
        assert_eq!(authority.verify(&second).unwrap(), alice());
    }

    proptest! {
        #[test]
        fn prop_verify_returns_issued_username(name in ".{1,40}") {
            let authority = authority_with_clock(Arc::new(ManualClock::new(start())));
            let username = Username::new(name).unwrap();
            let token = authority.issue(&username).unwrap();

            prop_assert_eq!(authority.verify(&token).unwrap(), username);
        }
    }
}
