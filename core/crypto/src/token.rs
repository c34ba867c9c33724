//! HS256 signing of session claims.
//!
//! Only the signature and structure are checked here. Expiry is judged by the
//! caller against its own clock so that validity windows stay configurable
//! and testable.

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::SigningSecret;
use lockbox_common::{Error, Result};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username the token was issued to.
    pub sub: String,
    /// Issue time, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry time, seconds since the Unix epoch.
    pub exp: i64,
}

/// Reason a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenFault {
    /// Not a well-formed token or claims are missing.
    #[error("malformed token")]
    Malformed,
    /// Signature does not match the secret, or the algorithm is not HS256.
    #[error("signature mismatch")]
    BadSignature,
    /// Validity window has passed.
    #[error("token expired")]
    Expired,
}

/// Sign claims into a compact token string.
///
/// # Errors
/// - Returns error if the claims cannot be serialized or signed
pub fn sign_claims(secret: &SigningSecret, claims: &SessionClaims) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Crypto(format!("Token signing failed: {}", e)))
}

/// Check a token's signature and decode its claims.
///
/// Expiry is NOT checked.
pub fn verify_signature(
    secret: &SigningSecret,
    token: &str,
) -> std::result::Result<SessionClaims, TokenFault> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;

    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                TokenFault::BadSignature
            }
            _ => TokenFault::Malformed,
        })
}
