//! HTTP transport adapter for Lockbox.
//!
//! Decodes JSON requests, forwards the caller's bearer token unmodified to
//! the request handler, and maps each classified outcome onto an HTTP
//! status with a stable error code.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use config::ServerConfig;
pub use error::{status_for, ApiError, ServerError};
pub use routes::router;
pub use server::{serve, shutdown_signal};
