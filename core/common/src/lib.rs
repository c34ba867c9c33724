//! Common utilities and types shared across Lockbox modules.
//!
//! This module provides the collaborator error type, the closed set of
//! outcome kinds seen by callers, and the record model passed between the
//! stores, the core and the transport.

pub mod api;
pub mod error;
pub mod kind;
pub mod payload;
pub mod types;

pub use error::{Error, Result};
pub use kind::ErrorKind;
pub use payload::{CardPayload, LoginPayload};
pub use types::{NewRecord, Record, RecordId, RecordKind, SensitiveBytes, Username};
