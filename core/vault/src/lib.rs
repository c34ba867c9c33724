//! Authentication and authorization core for Lockbox.
//!
//! This module provides:
//! - The Session Authority issuing and verifying signed, time-limited tokens
//! - The Access Controller enforcing record ownership
//! - The Request Handler orchestrating every vault operation
//! - The error taxonomy every collaborator failure is classified into
//!
//! # Architecture
//! The handler sits between the transport adapter and the stores. It holds
//! no mutable state of its own; all mutation is delegated to the stores.

pub mod access;
pub mod config;
pub mod error;
pub mod handler;
pub mod session;

pub use access::AccessController;
pub use config::{AuthConfig, Clock, ManualClock, SystemClock, DEFAULT_TOKEN_TTL};
pub use error::{SessionError, VaultError, VaultResult};
pub use handler::{RequestHandler, VersionInfo};
pub use session::SessionAuthority;
