//! Store trait definitions.

use async_trait::async_trait;

use lockbox_common::{NewRecord, Record, RecordId, Result, Username};

/// Persistence of user credentials.
///
/// Implementations must enforce username uniqueness atomically: the
/// existence check alone is not sufficient under concurrency.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Check whether a username is registered.
    async fn user_exists(&self, username: &Username) -> Result<bool>;

    /// Persist a new user.
    ///
    /// # Postconditions
    /// - Exactly one of any set of concurrent calls for the same username
    ///   succeeds
    ///
    /// # Errors
    /// - `Error::AlreadyExists` if the username is taken
    /// - Storage errors
    async fn create_user(&self, username: &Username, password_hash: &str) -> Result<()>;

    /// Look up the stored password hash.
    ///
    /// # Returns
    /// `None` if the user does not exist.
    async fn password_hash(&self, username: &Username) -> Result<Option<String>>;
}

/// Persistence of records keyed by server-assigned ids.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a record owned by `owner`.
    ///
    /// # Postconditions
    /// - Returns a fresh id, greater than every id issued before
    async fn create_record(&self, owner: &Username, record: NewRecord) -> Result<RecordId>;

    /// Fetch a record by id.
    async fn record(&self, id: RecordId) -> Result<Option<Record>>;

    /// Look up the owner of a record.
    async fn record_owner(&self, id: RecordId) -> Result<Option<Username>>;

    /// Replace `meta` and `data` of a record. Kind and owner are untouched.
    ///
    /// # Returns
    /// `false` if the record did not exist at the time of the write.
    async fn update_record(&self, id: RecordId, meta: &str, data: &[u8]) -> Result<bool>;

    /// Delete a record. Deleting an absent record is not an error.
    async fn delete_record(&self, id: RecordId) -> Result<()>;

    /// All records owned by `owner`, in id order.
    async fn records_by_owner(&self, owner: &Username) -> Result<Vec<Record>>;

    /// Check whether a record exists.
    async fn record_exists(&self, id: RecordId) -> Result<bool>;
}
