//! Resolution of a configured database location into store handles.

use std::path::PathBuf;
use std::sync::Arc;

use crate::memory::MemoryStore;
use crate::provider::{CredentialStore, RecordStore};
use crate::sqlite::SqliteStore;
use lockbox_common::Result;

/// Location value selecting the in-memory backend.
pub const MEMORY_LOCATION: &str = ":memory:";

/// Which persistence engine backs the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Volatile in-process maps.
    Memory,
    /// SQLite database file.
    Sqlite(PathBuf),
}

impl StoreBackend {
    /// Parse a database location; `:memory:` selects [`StoreBackend::Memory`].
    pub fn from_location(location: &str) -> Self {
        if location == MEMORY_LOCATION {
            StoreBackend::Memory
        } else {
            StoreBackend::Sqlite(PathBuf::from(location))
        }
    }

    /// Open the backend.
    ///
    /// # Errors
    /// - Database file cannot be opened or migrated
    pub fn open(&self) -> Result<Stores> {
        match self {
            StoreBackend::Memory => Ok(Stores::shared(MemoryStore::new())),
            StoreBackend::Sqlite(path) => Ok(Stores::shared(SqliteStore::open(path)?)),
        }
    }
}

/// Handles to the two store collaborators.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub records: Arc<dyn RecordStore>,
}

impl Stores {
    /// Use one store value for both credentials and records.
    pub fn shared<S>(store: S) -> Self
    where
        S: CredentialStore + RecordStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            credentials: store.clone(),
            records: store,
        }
    }
}
