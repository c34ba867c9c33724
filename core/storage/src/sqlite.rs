//! SQLite-backed credential and record store.
//!
//! A single connection is shared behind a mutex; every call runs on the
//! blocking thread pool so the async executor is never stalled by disk I/O.

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::provider::{CredentialStore, RecordStore};
use lockbox_common::{Error, NewRecord, Record, RecordId, RecordKind, Result, Username};

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    data BLOB NOT NULL,
    meta TEXT NOT NULL,
    owner TEXT NOT NULL REFERENCES users(username)
);

CREATE INDEX IF NOT EXISTS idx_records_owner ON records(owner);
"#;

/// SQLite store implementing both store traits.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create or open a database file and apply the schema.
    ///
    /// # Errors
    /// - Database creation or migration failure
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(storage_error)?;
        Self::init(conn, &db_path.as_ref().display().to_string())
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, location: &str) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(storage_error)?;
        info!("Record store opened at {}", location);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::Storage("Connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Storage(format!("Store task failed: {}", e)))?
    }
}

fn storage_error(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

fn username_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Username> {
    let raw: String = row.get(idx)?;
    Username::new(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let kind: String = row.get(1)?;
    let kind = kind
        .parse::<RecordKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(Record {
        id: RecordId::new(row.get(0)?),
        kind,
        data: row.get(2)?,
        meta: row.get(3)?,
        owner: username_column(row, 4)?,
    })
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn user_exists(&self, username: &Username) -> Result<bool> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM users WHERE username = ?1)",
                params![username],
                |row| row.get(0),
            )
            .map_err(storage_error)
        })
        .await
    }

    async fn create_user(&self, username: &Username, password_hash: &str) -> Result<()> {
        let username = username.to_string();
        let password_hash = password_hash.to_string();
        self.with_conn(move |conn| {
            match conn.execute(
                "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
                params![username, password_hash],
            ) {
                Ok(_) => {
                    debug!("Created user {}", username);
                    Ok(())
                }
                Err(e) if is_unique_violation(&e) => {
                    Err(Error::AlreadyExists(format!("User '{}'", username)))
                }
                Err(e) => Err(storage_error(e)),
            }
        })
        .await
    }

    async fn password_hash(&self, username: &Username) -> Result<Option<String>> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_error)
        })
        .await
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_record(&self, owner: &Username, record: NewRecord) -> Result<RecordId> {
        let owner = owner.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO records (kind, data, meta, owner) VALUES (?1, ?2, ?3, ?4)",
                params![record.kind.as_str(), record.data, record.meta, owner],
            )
            .map_err(storage_error)?;
            let id = RecordId::new(conn.last_insert_rowid());
            debug!("Created record {} for {}", id, owner);
            Ok(id)
        })
        .await
    }

    async fn record(&self, id: RecordId) -> Result<Option<Record>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, kind, data, meta, owner FROM records WHERE id = ?1",
                params![id.get()],
                record_from_row,
            )
            .optional()
            .map_err(storage_error)
        })
        .await
    }

    async fn record_owner(&self, id: RecordId) -> Result<Option<Username>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT owner FROM records WHERE id = ?1",
                params![id.get()],
                |row| username_column(row, 0),
            )
            .optional()
            .map_err(storage_error)
        })
        .await
    }

    async fn update_record(&self, id: RecordId, meta: &str, data: &[u8]) -> Result<bool> {
        let meta = meta.to_string();
        let data = data.to_vec();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE records SET data = ?1, meta = ?2 WHERE id = ?3",
                    params![data, meta, id.get()],
                )
                .map_err(storage_error)?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_record(&self, id: RecordId) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM records WHERE id = ?1", params![id.get()])
                .map_err(storage_error)?;
            Ok(())
        })
        .await
    }

    async fn records_by_owner(&self, owner: &Username) -> Result<Vec<Record>> {
        let owner = owner.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, kind, data, meta, owner FROM records WHERE owner = ?1 ORDER BY id",
                )
                .map_err(storage_error)?;
            let rows = stmt
                .query_map(params![owner], record_from_row)
                .map_err(storage_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error)
        })
        .await
    }

    async fn record_exists(&self, id: RecordId) -> Result<bool> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM records WHERE id = ?1)",
                params![id.get()],
                |row| row.get(0),
            )
            .map_err(storage_error)
        })
        .await
    }
}
