//! Request handler: the single entry point for every vault operation.
//!
//! Each method is independent and reentrant. The handler recovers nothing
//! locally and never retries; every failure short-circuits the operation
//! with a classified [`VaultError`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access::AccessController;
use crate::error::{VaultError, VaultResult};
use crate::session::SessionAuthority;
use lockbox_common::{Error, NewRecord, Record, RecordId, SensitiveBytes, Username};
use lockbox_crypto::CredentialHasher;
use lockbox_storage::{CredentialStore, RecordStore, Stores};

/// Build information reported by the version operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub name: String,
}

/// Orchestrates stores, the Session Authority and the Access Controller.
#[derive(Clone)]
pub struct RequestHandler {
    credentials: Arc<dyn CredentialStore>,
    records: Arc<dyn RecordStore>,
    hasher: Arc<dyn CredentialHasher>,
    authority: Arc<SessionAuthority>,
    access: AccessController,
}

impl RequestHandler {
    /// Create a handler over the given collaborators.
    pub fn new(
        stores: Stores,
        hasher: Arc<dyn CredentialHasher>,
        authority: Arc<SessionAuthority>,
    ) -> Self {
        let access = AccessController::new(authority.clone(), stores.records.clone());
        Self {
            credentials: stores.credentials,
            records: stores.records,
            hasher,
            authority,
            access,
        }
    }

    /// Report the server build.
    pub fn version(&self) -> VersionInfo {
        VersionInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: "lockbox".to_string(),
        }
    }

    /// Register a new user and log them in.
    ///
    /// # Errors
    /// - `Conflict` if the username is taken, including when a concurrent
    ///   registration wins the race after the existence check
    /// - `Internal` if hashing, storage or signing fails
    pub async fn register(
        &self,
        username: &Username,
        password: &SensitiveBytes,
    ) -> VaultResult<String> {
        let exists = self
            .credentials
            .user_exists(username)
            .await
            .map_err(|e| VaultError::internal("user_exists", e))?;
        if exists {
            info!(user = %username, "Registration refused: username taken");
            return Err(VaultError::Conflict);
        }

        let hash = self.hash_password(password).await?;

        match self.credentials.create_user(username, &hash).await {
            Ok(()) => {}
            Err(Error::AlreadyExists(_)) => {
                info!(user = %username, "Registration lost race for username");
                return Err(VaultError::Conflict);
            }
            Err(e) => return Err(VaultError::internal("create_user", e)),
        }

        info!(user = %username, "Registered user");
        self.issue_token(username)
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    ///
    /// # Errors
    /// - `Unauthenticated` if the user is unknown or the password is wrong
    /// - `Internal` if the store fails or the stored hash is unreadable
    pub async fn login(
        &self,
        username: &Username,
        password: &SensitiveBytes,
    ) -> VaultResult<String> {
        let hash = self
            .credentials
            .password_hash(username)
            .await
            .map_err(|e| VaultError::internal("password_hash", e))?;

        let Some(hash) = hash else {
            warn!(user = %username, "Login failed: unknown user");
            return Err(VaultError::Unauthenticated);
        };

        if !self.verify_password(password, hash).await? {
            warn!(user = %username, "Login failed: wrong password");
            return Err(VaultError::Unauthenticated);
        }

        info!(user = %username, "User logged in");
        self.issue_token(username)
    }

    /// Store a new record owned by the caller.
    ///
    /// # Errors
    /// - `Unauthenticated` if the token does not verify
    /// - `Internal` if the store fails
    pub async fn store(&self, token: &str, record: NewRecord) -> VaultResult<RecordId> {
        let caller = self.access.authenticate(token)?;
        let kind = record.kind;

        let id = self
            .records
            .create_record(&caller, record)
            .await
            .map_err(|e| VaultError::internal("create_record", e))?;

        info!(user = %caller, record = %id, kind = %kind, "Stored record");
        Ok(id)
    }

    /// Fetch a record the caller owns.
    ///
    /// # Errors
    /// - `Unauthenticated`, `NotFound`, `AccessDenied` from the access check
    /// - `NotFound` if the record vanished after the check
    /// - `Internal` if the store fails
    pub async fn retrieve(&self, token: &str, id: RecordId) -> VaultResult<Record> {
        let caller = self.access.authorize(token, id).await?;

        let record = self
            .records
            .record(id)
            .await
            .map_err(|e| VaultError::internal("record", e))?
            .ok_or(VaultError::NotFound)?;

        debug!(user = %caller, record = %id, "Retrieved record");
        Ok(record)
    }

    /// Replace the description and payload of a record the caller owns.
    ///
    /// The record's kind and owner never change.
    ///
    /// # Errors
    /// - `Unauthenticated`, `NotFound`, `AccessDenied` from the access check
    /// - `NotFound` if the record is absent when the store applies the write
    /// - `Internal` if the store fails
    pub async fn update(
        &self,
        token: &str,
        id: RecordId,
        meta: &str,
        data: &[u8],
    ) -> VaultResult<()> {
        let caller = self.access.authorize(token, id).await?;

        let updated = self
            .records
            .update_record(id, meta, data)
            .await
            .map_err(|e| VaultError::internal("update_record", e))?;
        if !updated {
            return Err(VaultError::NotFound);
        }

        info!(user = %caller, record = %id, "Updated record");
        Ok(())
    }

    /// List every record the caller owns. The list may be empty.
    ///
    /// # Errors
    /// - `Unauthenticated` if the token does not verify
    /// - `Internal` if the store fails
    pub async fn list(&self, token: &str) -> VaultResult<Vec<Record>> {
        let caller = self.access.authenticate(token)?;

        let records = self
            .records
            .records_by_owner(&caller)
            .await
            .map_err(|e| VaultError::internal("records_by_owner", e))?;

        debug!(user = %caller, count = records.len(), "Listed records");
        Ok(records)
    }

    /// Delete a record the caller owns.
    ///
    /// # Errors
    /// - `Unauthenticated`, `NotFound`, `AccessDenied` from the access check
    /// - `NotFound` if the record no longer exists
    /// - `Internal` if the store fails
    pub async fn delete(&self, token: &str, id: RecordId) -> VaultResult<()> {
        let caller = self.access.authorize(token, id).await?;

        let exists = self
            .records
            .record_exists(id)
            .await
            .map_err(|e| VaultError::internal("record_exists", e))?;
        if !exists {
            return Err(VaultError::NotFound);
        }

        self.records
            .delete_record(id)
            .await
            .map_err(|e| VaultError::internal("delete_record", e))?;

        info!(user = %caller, record = %id, "Deleted record");
        Ok(())
    }

    fn issue_token(&self, username: &Username) -> VaultResult<String> {
        self.authority
            .issue(username)
            .map_err(|e| VaultError::internal("issue_token", e))
    }

    async fn hash_password(&self, password: &SensitiveBytes) -> VaultResult<String> {
        let hasher = self.hasher.clone();
        let password = password.clone();

        // Keep Argon2 off the async workers.
        tokio::task::spawn_blocking(move || hasher.hash(password.as_bytes()))
            .await
            .map_err(|e| VaultError::internal("hash_password", e))?
            .map_err(|e| VaultError::internal("hash_password", e))
    }

    async fn verify_password(&self, password: &SensitiveBytes, hash: String) -> VaultResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.clone();

        tokio::task::spawn_blocking(move || hasher.verify(password.as_bytes(), &hash))
            .await
            .map_err(|e| VaultError::internal("verify_password", e))?
            .map_err(|e| VaultError::internal("verify_password", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ManualClock};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use lockbox_common::{ErrorKind, LoginPayload, RecordKind, Result};
    use lockbox_crypto::{Argon2Hasher, KdfParams, SigningSecret};
    use lockbox_storage::MemoryStore;

    fn cheap_hasher() -> Arc<dyn CredentialHasher> {
        Arc::new(Argon2Hasher::new(KdfParams {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        }))
    }

    fn authority(clock: Arc<ManualClock>) -> Arc<SessionAuthority> {
        let secret = SigningSecret::from_bytes(b"test-secret".to_vec()).unwrap();
        Arc::new(SessionAuthority::with_clock(AuthConfig::new(secret), clock))
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ))
    }

    fn handler() -> RequestHandler {
        handler_with_clock(clock())
    }

    fn handler_with_clock(clock: Arc<ManualClock>) -> RequestHandler {
        RequestHandler::new(
            Stores::shared(MemoryStore::new()),
            cheap_hasher(),
            authority(clock),
        )
    }

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    fn password(p: &str) -> SensitiveBytes {
        SensitiveBytes::from(p.to_string())
    }

    fn text(meta: &str, data: &[u8]) -> NewRecord {
        NewRecord {
            kind: RecordKind::Text,
            data: data.to_vec(),
            meta: meta.to_string(),
        }
    }

    async fn register(handler: &RequestHandler, name: &str) -> String {
        handler
            .register(&user(name), &password("pw-123"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_returns_working_token() {
        let handler = handler();
        let token = register(&handler, "alice").await;

        assert!(handler.list(&token).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let handler = handler();
        register(&handler, "alice").await;

        let second = handler.register(&user("alice"), &password("other")).await;
        assert!(matches!(second, Err(VaultError::Conflict)));
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let handler = handler();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler
                        .register(&user("carol"), &password(&format!("pw-{}", i)))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(VaultError::Conflict) => conflicts += 1,
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_login() {
        let handler = handler();
        register(&handler, "alice").await;

        let token = handler
            .login(&user("alice"), &password("pw-123"))
            .await
            .unwrap();
        assert!(handler.list(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_failures_indistinguishable() {
        let handler = handler();
        register(&handler, "alice").await;

        let wrong_password = handler
            .login(&user("alice"), &password("wrong"))
            .await
            .unwrap_err();
        let unknown_user = handler
            .login(&user("mallory"), &password("pw-123"))
            .await
            .unwrap_err();

        assert_eq!(wrong_password.kind(), ErrorKind::Unauthenticated);
        assert_eq!(unknown_user.kind(), ErrorKind::Unauthenticated);
        assert_eq!(wrong_password.user_message(), unknown_user.user_message());
    }

    #[tokio::test]
    async fn test_login_is_case_sensitive() {
        let handler = handler();
        register(&handler, "alice").await;

        assert!(matches!(
            handler.login(&user("Alice"), &password("pw-123")).await,
            Err(VaultError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_store_retrieve_roundtrip() {
        let handler = handler();
        let token = register(&handler, "alice").await;

        let id = handler
            .store(&token, text("diary", b"dear diary"))
            .await
            .unwrap();
        let record = handler.retrieve(&token, id).await.unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.kind, RecordKind::Text);
        assert_eq!(record.data, b"dear diary");
        assert_eq!(record.meta, "diary");
        assert_eq!(record.owner, user("alice"));
    }

    #[tokio::test]
    async fn test_alice_and_bob_scenario() {
        let handler = handler();
        let t1 = register(&handler, "alice").await;

        let payload = LoginPayload {
            login: "x".to_string(),
            password: "y".to_string(),
        }
        .to_bytes()
        .unwrap();
        let id = handler
            .store(
                &t1,
                NewRecord {
                    kind: RecordKind::Login,
                    data: payload.clone(),
                    meta: "bank".to_string(),
                },
            )
            .await
            .unwrap();

        let t2 = register(&handler, "bob").await;
        assert!(matches!(
            handler.retrieve(&t2, id).await,
            Err(VaultError::AccessDenied)
        ));

        let record = handler.retrieve(&t1, id).await.unwrap();
        assert_eq!(record.data, payload);
        assert_eq!(record.meta, "bank");
        assert_eq!(record.kind, RecordKind::Login);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_delete() {
        let handler = handler();
        let alice = register(&handler, "alice").await;
        let bob = register(&handler, "bob").await;
        let id = handler.store(&alice, text("n", b"original")).await.unwrap();

        assert!(matches!(
            handler.update(&bob, id, "pwned", b"pwned").await,
            Err(VaultError::AccessDenied)
        ));
        assert!(matches!(
            handler.delete(&bob, id).await,
            Err(VaultError::AccessDenied)
        ));

        let record = handler.retrieve(&alice, id).await.unwrap();
        assert_eq!(record.data, b"original");
    }

    #[tokio::test]
    async fn test_update_replaces_meta_and_data_only() {
        let handler = handler();
        let token = register(&handler, "alice").await;
        let id = handler.store(&token, text("old", b"old")).await.unwrap();

        handler.update(&token, id, "new", b"new").await.unwrap();
        let record = handler.retrieve(&token, id).await.unwrap();

        assert_eq!(record.meta, "new");
        assert_eq!(record.data, b"new");
        assert_eq!(record.kind, RecordKind::Text);
        assert_eq!(record.owner, user("alice"));
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let handler = handler();
        let token = register(&handler, "alice").await;
        let id = handler.store(&token, text("n", b"x")).await.unwrap();

        handler.delete(&token, id).await.unwrap();

        assert!(matches!(
            handler.retrieve(&token, id).await,
            Err(VaultError::NotFound)
        ));
        assert!(matches!(
            handler.delete(&token, id).await,
            Err(VaultError::NotFound)
        ));
        assert!(matches!(
            handler.update(&token, id, "m", b"d").await,
            Err(VaultError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_only_own_records() {
        let handler = handler();
        let alice = register(&handler, "alice").await;
        let bob = register(&handler, "bob").await;

        let a1 = handler.store(&alice, text("a1", b"1")).await.unwrap();
        handler.store(&bob, text("b1", b"2")).await.unwrap();
        let a2 = handler.store(&alice, text("a2", b"3")).await.unwrap();

        let ids: Vec<_> = handler
            .list(&alice)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![a1, a2]);
    }

    #[tokio::test]
    async fn test_invalid_token_everywhere() {
        let handler = handler();
        let alice = register(&handler, "alice").await;
        let id = handler.store(&alice, text("n", b"x")).await.unwrap();
        let bad = "not-a-token";

        assert!(matches!(
            handler.store(bad, text("n", b"x")).await,
            Err(VaultError::Unauthenticated)
        ));
        assert!(matches!(
            handler.retrieve(bad, id).await,
            Err(VaultError::Unauthenticated)
        ));
        assert!(matches!(
            handler.update(bad, id, "m", b"d").await,
            Err(VaultError::Unauthenticated)
        ));
        assert!(matches!(
            handler.list(bad).await,
            Err(VaultError::Unauthenticated)
        ));
        assert!(matches!(
            handler.delete(bad, id).await,
            Err(VaultError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let clock = clock();
        let handler = handler_with_clock(clock.clone());
        let token = register(&handler, "alice").await;

        clock.advance(Duration::hours(12) + Duration::seconds(1));

        assert!(matches!(
            handler.list(&token).await,
            Err(VaultError::Unauthenticated)
        ));
        // Logging in again yields a fresh token.
        let fresh = handler
            .login(&user("alice"), &password("pw-123"))
            .await
            .unwrap();
        assert!(handler.list(&fresh).await.is_ok());
    }

    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn user_exists(&self, _: &Username) -> Result<bool> {
            Err(Error::Storage("connection refused to db.internal:5432".to_string()))
        }

        async fn create_user(&self, _: &Username, _: &str) -> Result<()> {
            Err(Error::Storage("connection refused to db.internal:5432".to_string()))
        }

        async fn password_hash(&self, _: &Username) -> Result<Option<String>> {
            Err(Error::Storage("connection refused to db.internal:5432".to_string()))
        }
    }

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn create_record(&self, _: &Username, _: NewRecord) -> Result<RecordId> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn record(&self, _: RecordId) -> Result<Option<Record>> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn record_owner(&self, _: RecordId) -> Result<Option<Username>> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn update_record(&self, _: RecordId, _: &str, _: &[u8]) -> Result<bool> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn delete_record(&self, _: RecordId) -> Result<()> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn records_by_owner(&self, _: &Username) -> Result<Vec<Record>> {
            Err(Error::Storage("disk full".to_string()))
        }

        async fn record_exists(&self, _: RecordId) -> Result<bool> {
            Err(Error::Storage("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_internal() {
        let clock = clock();
        let authority = authority(clock);
        let handler = RequestHandler::new(
            Stores::shared(FailingStore),
            cheap_hasher(),
            authority.clone(),
        );
        let token = authority.issue(&user("alice")).unwrap();

        let errors = vec![
            handler
                .register(&user("alice"), &password("pw"))
                .await
                .unwrap_err(),
            handler
                .login(&user("alice"), &password("pw"))
                .await
                .unwrap_err(),
            handler.store(&token, text("n", b"x")).await.unwrap_err(),
            handler.retrieve(&token, RecordId::new(1)).await.unwrap_err(),
            handler.list(&token).await.unwrap_err(),
        ];

        for err in errors {
            assert_eq!(err.kind(), ErrorKind::Internal);
            assert!(!err.user_message().contains("db.internal"));
            assert!(!err.user_message().contains("disk"));
        }
    }

    /// Record store whose reads succeed for a record owned by alice but
    /// whose writes fail.
    struct BrokenWrites {
        exists_fails: bool,
    }

    #[async_trait]
    impl RecordStore for BrokenWrites {
        async fn create_record(&self, _: &Username, _: NewRecord) -> Result<RecordId> {
            Ok(RecordId::new(1))
        }

        async fn record(&self, _: RecordId) -> Result<Option<Record>> {
            Ok(None)
        }

        async fn record_owner(&self, _: RecordId) -> Result<Option<Username>> {
            Ok(Some(user("alice")))
        }

        async fn update_record(&self, _: RecordId, _: &str, _: &[u8]) -> Result<bool> {
            Err(Error::Storage("disk I/O error on update".to_string()))
        }

        async fn delete_record(&self, _: RecordId) -> Result<()> {
            Err(Error::Storage("disk I/O error on delete".to_string()))
        }

        async fn records_by_owner(&self, _: &Username) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }

        async fn record_exists(&self, _: RecordId) -> Result<bool> {
            if self.exists_fails {
                Err(Error::Storage("disk I/O error on lookup".to_string()))
            } else {
                Ok(true)
            }
        }
    }

    fn handler_with_broken_writes(exists_fails: bool) -> (RequestHandler, String) {
        let authority = authority(clock());
        let stores = Stores {
            credentials: Arc::new(MemoryStore::new()),
            records: Arc::new(BrokenWrites { exists_fails }),
        };
        let handler = RequestHandler::new(stores, cheap_hasher(), authority.clone());
        let token = authority.issue(&user("alice")).unwrap();
        (handler, token)
    }

    #[tokio::test]
    async fn test_write_failures_after_access_check_are_internal() {
        let (handler, token) = handler_with_broken_writes(false);
        let id = RecordId::new(1);

        let mut errors = vec![
            handler.update(&token, id, "m", b"x").await.unwrap_err(),
            handler.delete(&token, id).await.unwrap_err(),
        ];

        // Existence re-check before delete fails too.
        let (handler, token) = handler_with_broken_writes(true);
        errors.push(handler.delete(&token, id).await.unwrap_err());

        for err in errors {
            assert_eq!(err.kind(), ErrorKind::Internal);
            assert!(!err.user_message().contains("disk"));
            assert!(err.to_string().contains("disk I/O error"));
        }
    }

    #[tokio::test]
    async fn test_failing_store_still_rejects_bad_token_first() {
        let handler = RequestHandler::new(
            Stores::shared(FailingStore),
            cheap_hasher(),
            authority(clock()),
        );

        assert!(matches!(
            handler.retrieve("bad", RecordId::new(1)).await,
            Err(VaultError::Unauthenticated)
        ));
    }

    #[test]
    fn test_version() {
        let info = handler().version();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.name, "lockbox");
    }
}
