//! Store port traits.
//!
//! The coordinator never assumes the two accounts live in the same store,
//! so there is no cross-aggregate transaction anywhere in these contracts:
//! `compare_and_swap` on a single account version is the only mutation
//! primitive, and the transfer record gets its own independent store.

use crate::domain::{
    Account, AccountNumber, AppliedVersions, FailureReason, TransferId, TransferRecord,
    TransferStatus,
};
use crate::error::StoreError;

/// Outcome of `TransferStore::create_if_absent`.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// The record was written; this attempt owns the transfer.
    Created,
    /// A record with this id already exists; holds the stored record.
    Exists(TransferRecord),
}

/// Port for loading and conditionally persisting account aggregates.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// Loads an account by identity, capturing its current version.
    async fn load(&self, id: &AccountNumber) -> Result<Option<Account>, StoreError>;

    /// Persists `new` only if the stored version still equals `old.version`.
    ///
    /// Fails with `StoreError::VersionConflict` when a concurrent mutation
    /// raced ahead; the caller is expected to reload and retry.
    async fn compare_and_swap(&self, old: &Account, new: &Account) -> Result<(), StoreError>;
}

/// Port for persisting transfer records keyed by idempotency id.
#[async_trait::async_trait]
pub trait TransferStore: Send + Sync + 'static {
    /// Finds a transfer record by id.
    async fn find_by_id(&self, id: &TransferId) -> Result<Option<TransferRecord>, StoreError>;

    /// Writes the record unless one with the same id already exists.
    async fn create_if_absent(&self, record: TransferRecord) -> Result<InsertOutcome, StoreError>;

    /// Records (or clears) the account versions an imminent commit will
    /// produce. Written before the first balance mutation so a later
    /// driver of the same PENDING record can tell whether those writes
    /// landed. Writes against a terminal record fail with
    /// `StoreError::Conflict`.
    async fn set_applied_versions(
        &self,
        id: &TransferId,
        versions: Option<AppliedVersions>,
    ) -> Result<(), StoreError>;

    /// Drives the record's status state machine. Writes against a terminal
    /// record fail with `StoreError::Conflict`.
    async fn update_status(
        &self,
        id: &TransferId,
        status: TransferStatus,
        reason: Option<FailureReason>,
    ) -> Result<(), StoreError>;
}
