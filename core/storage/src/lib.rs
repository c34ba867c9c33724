//! Store abstractions for Lockbox.
//!
//! This module provides the two persistence collaborators the core depends
//! on, the Credential Store and the Record Store, together with an
//! in-memory implementation and a SQLite implementation.
//!
//! # Design Principles
//! - Each trait method is a single atomic call into the store
//! - Uniqueness and id allocation are enforced by the store, not its callers
//! - Absence is reported as `None`/`false`, never as an error

pub mod backend;
pub mod memory;
pub mod provider;
pub mod sqlite;

pub use backend::{StoreBackend, Stores, MEMORY_LOCATION};
pub use memory::MemoryStore;
pub use provider::{CredentialStore, RecordStore};
pub use sqlite::SqliteStore;
