//! Ownership-based access control.
//!
//! Every operation on an existing record goes through
//! [`AccessController::authorize`]. Authentication is always checked before
//! the record is looked up, so an invalid token never reveals whether an id
//! exists.

use std::sync::Arc;
use tracing::warn;

use crate::error::{VaultError, VaultResult};
use crate::session::SessionAuthority;
use lockbox_common::{RecordId, Username};
use lockbox_storage::RecordStore;

/// Resolves caller identity and decides whether a record operation proceeds.
#[derive(Clone)]
pub struct AccessController {
    authority: Arc<SessionAuthority>,
    records: Arc<dyn RecordStore>,
}

impl AccessController {
    /// Create a controller over the given authority and record store.
    pub fn new(authority: Arc<SessionAuthority>, records: Arc<dyn RecordStore>) -> Self {
        Self { authority, records }
    }

    /// Resolve the caller of an operation that does not target an existing
    /// record.
    ///
    /// # Errors
    /// - `VaultError::Unauthenticated` if the token does not verify
    pub fn authenticate(&self, token: &str) -> VaultResult<Username> {
        self.authority.verify(token).map_err(|e| {
            warn!(reason = %e, "Rejected session token");
            VaultError::Unauthenticated
        })
    }

    /// Resolve the caller and check that they own `id`.
    ///
    /// # Postconditions
    /// - On success the returned username equals the record's owner
    ///
    /// # Errors
    /// - `VaultError::Unauthenticated` if the token does not verify
    /// - `VaultError::NotFound` if the record does not exist
    /// - `VaultError::AccessDenied` if the record belongs to someone else
    /// - `VaultError::Internal` if the owner lookup fails
    pub async fn authorize(&self, token: &str, id: RecordId) -> VaultResult<Username> {
        let caller = self.authenticate(token)?;

        let owner = self
            .records
            .record_owner(id)
            .await
            .map_err(|e| VaultError::internal("record_owner", e))?
            .ok_or(VaultError::NotFound)?;

        if owner != caller {
            warn!(caller = %caller, record = %id, "Refused access to record owned by another user");
            return Err(VaultError::AccessDenied);
        }

        Ok(caller)
    }
}
