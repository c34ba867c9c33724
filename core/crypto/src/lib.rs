//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - Salted password hashing using Argon2id (PHC string format)
//! - A signing secret with automatic zeroization
//! - HS256 signing and signature verification of session claims
//!
//! # Security Guarantees
//! - Secret material is zeroized on drop and never logged
//! - Password verification uses the hashing primitive's own comparison
//! - Tokens signed with any algorithm other than HS256 are rejected

pub mod kdf;
pub mod keys;
pub mod token;

pub use kdf::{Argon2Hasher, CredentialHasher, KdfParams};
pub use keys::SigningSecret;
pub use token::{sign_claims, verify_signature, SessionClaims, TokenFault};
