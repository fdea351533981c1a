//! # Transfer Store (in-memory)
//!
//! In-memory adapters implementing the `AccountStore` and `TransferStore`
//! ports on `dashmap`. The reference adapter for tests and examples; a
//! database-backed adapter would slot in behind the same traits.
//!
//! The account CAS holds the per-entry lock only for the version compare
//! and the swap itself; there is no lock spanning two accounts anywhere,
//! which is exactly the constraint the coordinator is designed for.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use transfer_types::{
    Account, AccountNumber, AccountStore, AppliedVersions, FailureReason, InsertOutcome,
    StoreError, TransferId, TransferRecord, TransferStatus, TransferStore,
};

/// Account store keyed by `AccountNumber`.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<AccountNumber, Account>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account, for test setup.
    pub fn seed_account(&self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }

    /// Reads a balance directly, bypassing the port. Test helper.
    pub fn balance_of(&self, id: &AccountNumber) -> Option<i64> {
        self.accounts.get(id).map(|a| a.balance.amount())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn load(&self, id: &AccountNumber) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(id).map(|entry| entry.value().clone()))
    }

    async fn compare_and_swap(&self, old: &Account, new: &Account) -> Result<(), StoreError> {
        let mut entry = self.accounts.get_mut(&old.id).ok_or(StoreError::NotFound)?;
        if entry.version != old.version {
            return Err(StoreError::VersionConflict);
        }
        *entry = new.clone();
        Ok(())
    }
}

/// Transfer record store keyed by `TransferId`.
#[derive(Default)]
pub struct MemoryTransferStore {
    records: DashMap<TransferId, TransferRecord>,
}

impl MemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a record directly, bypassing the port. Test helper.
    pub fn record_of(&self, id: &TransferId) -> Option<TransferRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    async fn find_by_id(&self, id: &TransferId) -> Result<Option<TransferRecord>, StoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn create_if_absent(
        &self,
        record: TransferRecord,
    ) -> Result<InsertOutcome, StoreError> {
        match self.records.entry(record.id) {
            Entry::Occupied(occupied) => Ok(InsertOutcome::Exists(occupied.get().clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(record);
                Ok(InsertOutcome::Created)
            }
        }
    }

    async fn set_applied_versions(
        &self,
        id: &TransferId,
        versions: Option<AppliedVersions>,
    ) -> Result<(), StoreError> {
        let mut entry = self.records.get_mut(id).ok_or(StoreError::NotFound)?;
        if entry.status.is_terminal() {
            return Err(StoreError::Conflict("record already settled".into()));
        }
        entry.applied_versions = versions;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &TransferId,
        status: TransferStatus,
        reason: Option<FailureReason>,
    ) -> Result<(), StoreError> {
        let mut entry = self.records.get_mut(id).ok_or(StoreError::NotFound)?;
        let updated = match status {
            TransferStatus::Completed => entry.complete(),
            TransferStatus::Failed => {
                let reason =
                    reason.ok_or_else(|| StoreError::Conflict("failure without reason".into()))?;
                entry.fail(reason)
            }
            TransferStatus::Pending => {
                return Err(StoreError::Conflict("cannot revert to pending".into()));
            }
        }
        .map_err(|e| StoreError::Conflict(e.to_string()))?;
        *entry = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transfer_types::{BankCode, Currency, Money};

    fn account(number: &str, balance: i64) -> Account {
        Account::open(
            AccountNumber::new(BankCode::Northern, number).unwrap(),
            Money::new(balance, Currency::USD),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_cas_succeeds_on_matching_version() {
        let store = MemoryAccountStore::new();
        store.seed_account(account("1000001", 1000));

        let old = store
            .load(&AccountNumber::new(BankCode::Northern, "1000001").unwrap())
            .await
            .unwrap()
            .unwrap();
        let new = old.debit(Money::new(400, Currency::USD)).unwrap();

        store.compare_and_swap(&old, &new).await.unwrap();
        assert_eq!(store.balance_of(&old.id), Some(600));
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_version() {
        let store = MemoryAccountStore::new();
        store.seed_account(account("1000001", 1000));
        let id = AccountNumber::new(BankCode::Northern, "1000001").unwrap();

        let stale = store.load(&id).await.unwrap().unwrap();
        let first = stale.debit(Money::new(100, Currency::USD)).unwrap();
        store.compare_and_swap(&stale, &first).await.unwrap();

        // second writer still holds the version-0 snapshot
        let racing = stale.debit(Money::new(200, Currency::USD)).unwrap();
        let result = store.compare_and_swap(&stale, &racing).await;
        assert!(matches!(result, Err(StoreError::VersionConflict)));
        assert_eq!(store.balance_of(&id), Some(900));
    }

    #[tokio::test]
    async fn test_create_if_absent_is_first_writer_wins() {
        let store = MemoryTransferStore::new();
        let record = TransferRecord::pending(
            TransferId::new(),
            AccountNumber::new(BankCode::Northern, "1000001").unwrap(),
            AccountNumber::new(BankCode::Pacific, "2000002").unwrap(),
            Money::new(500, Currency::USD),
        );

        let first = store.create_if_absent(record.clone()).await.unwrap();
        assert!(matches!(first, InsertOutcome::Created));

        let second = store.create_if_absent(record.clone()).await.unwrap();
        match second {
            InsertOutcome::Exists(existing) => assert_eq!(existing.id, record.id),
            InsertOutcome::Created => panic!("duplicate insert must not win"),
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_applied_versions_persist_on_pending_records_only() {
        let store = MemoryTransferStore::new();
        let record = TransferRecord::pending(
            TransferId::new(),
            AccountNumber::new(BankCode::Northern, "1000001").unwrap(),
            AccountNumber::new(BankCode::Pacific, "2000002").unwrap(),
            Money::new(500, Currency::USD),
        );
        let id = record.id;
        store.create_if_absent(record).await.unwrap();

        let stamp = AppliedVersions {
            from_version: 3,
            to_version: 1,
        };
        store.set_applied_versions(&id, Some(stamp)).await.unwrap();
        assert_eq!(store.record_of(&id).unwrap().applied_versions, Some(stamp));

        store.set_applied_versions(&id, None).await.unwrap();
        assert!(store.record_of(&id).unwrap().applied_versions.is_none());

        store
            .update_status(&id, TransferStatus::Completed, None)
            .await
            .unwrap();
        let result = store.set_applied_versions(&id, Some(stamp)).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_status_refuses_terminal_rewrites() {
        let store = MemoryTransferStore::new();
        let record = TransferRecord::pending(
            TransferId::new(),
            AccountNumber::new(BankCode::Northern, "1000001").unwrap(),
            AccountNumber::new(BankCode::Pacific, "2000002").unwrap(),
            Money::new(500, Currency::USD),
        );
        let id = record.id;
        store.create_if_absent(record).await.unwrap();

        store
            .update_status(&id, TransferStatus::Completed, None)
            .await
            .unwrap();

        let result = store
            .update_status(
                &id,
                TransferStatus::Failed,
                Some(FailureReason::ConcurrentModification),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(
            store.record_of(&id).unwrap().status,
            TransferStatus::Completed
        );
    }
}
