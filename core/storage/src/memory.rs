//! In-memory store for testing and ephemeral deployments.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::provider::{CredentialStore, RecordStore};
use lockbox_common::{Error, NewRecord, Record, RecordId, Result, Username};

#[derive(Default)]
struct State {
    users: HashMap<Username, String>,
    records: BTreeMap<RecordId, Record>,
    last_id: i64,
}

/// In-memory credential and record store.
///
/// All data is stored in memory and lost on drop. Every operation runs
/// under a single lock, so each call is atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::Storage("Memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::Storage("Memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn user_exists(&self, username: &Username) -> Result<bool> {
        Ok(self.read()?.users.contains_key(username))
    }

    async fn create_user(&self, username: &Username, password_hash: &str) -> Result<()> {
        let mut state = self.write()?;
        if state.users.contains_key(username) {
            return Err(Error::AlreadyExists(format!("User '{}'", username)));
        }
        state
            .users
            .insert(username.clone(), password_hash.to_string());
        debug!("Created user {}", username);
        Ok(())
    }

    async fn password_hash(&self, username: &Username) -> Result<Option<String>> {
        Ok(self.read()?.users.get(username).cloned())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_record(&self, owner: &Username, record: NewRecord) -> Result<RecordId> {
        let mut state = self.write()?;
        state.last_id += 1;
        let id = RecordId::new(state.last_id);

        state.records.insert(
            id,
            Record {
                id,
                kind: record.kind,
                data: record.data,
                meta: record.meta,
                owner: owner.clone(),
            },
        );
        debug!("Created record {} for {}", id, owner);
        Ok(id)
    }

    async fn record(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    async fn record_owner(&self, id: RecordId) -> Result<Option<Username>> {
        Ok(self.read()?.records.get(&id).map(|r| r.owner.clone()))
    }

    async fn update_record(&self, id: RecordId, meta: &str, data: &[u8]) -> Result<bool> {
        let mut state = self.write()?;
        match state.records.get_mut(&id) {
            Some(record) => {
                record.meta = meta.to_string();
                record.data = data.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_record(&self, id: RecordId) -> Result<()> {
        self.write()?.records.remove(&id);
        Ok(())
    }

    async fn records_by_owner(&self, owner: &Username) -> Result<Vec<Record>> {
        Ok(self
            .read()?
            .records
            .values()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect())
    }

    async fn record_exists(&self, id: RecordId) -> Result<bool> {
        Ok(self.read()?.records.contains_key(&id))
    }
}
