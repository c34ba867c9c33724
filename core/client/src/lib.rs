//! HTTP client for a Lockbox server.
//!
//! Wraps the `/v1` routes, keeps the session token obtained at register or
//! login, and turns error bodies back into [`ErrorKind`](lockbox_common::ErrorKind)s.

pub mod client;
pub mod error;

pub use client::{ServerVersion, VaultClient};
pub use error::{ClientError, ClientResult};
