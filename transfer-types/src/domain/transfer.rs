//! Transfer record aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account_number::AccountNumber;
use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for a transfer; doubles as the idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Creates a new random TransferId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransferId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransferId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Status of a transfer record. PENDING is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStatus::Pending => write!(f, "PENDING"),
            TransferStatus::Completed => write!(f, "COMPLETED"),
            TransferStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Why a transfer ended up FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    InsufficientFunds,
    AccountNotActive,
    AccountNotFound,
    CurrencyMismatch,
    ConcurrentModification,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::InsufficientFunds => write!(f, "INSUFFICIENT_FUNDS"),
            FailureReason::AccountNotActive => write!(f, "ACCOUNT_NOT_ACTIVE"),
            FailureReason::AccountNotFound => write!(f, "ACCOUNT_NOT_FOUND"),
            FailureReason::CurrencyMismatch => write!(f, "CURRENCY_MISMATCH"),
            FailureReason::ConcurrentModification => write!(f, "CONCURRENT_MODIFICATION"),
        }
    }
}

/// Account versions a commit attempt is about to produce, persisted on
/// the record before the first balance write.
///
/// This is what lets a re-driver of a PENDING record recognize that the
/// prior attempt's account mutations already landed: a loaded account
/// whose version has reached the recorded value carries that leg's write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedVersions {
    /// Version the debited account carries once its write lands.
    pub from_version: u64,
    /// Version the credited account carries once its write lands.
    pub to_version: u64,
}

/// One transfer attempt, written ahead of any balance mutation.
///
/// References the two accounts by value (`AccountNumber`), never by
/// aggregate: the record and the accounts keep independent persistence
/// boundaries. The amount is fixed at creation. Once the status reaches
/// COMPLETED or FAILED the record is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Unique identifier and idempotency key
    pub id: TransferId,
    /// Debited account
    pub from_account: AccountNumber,
    /// Credited account
    pub to_account: AccountNumber,
    /// Amount moved; fixed at creation
    pub amount: Money,
    pub status: TransferStatus,
    /// When the record was first written
    pub created_at: DateTime<Utc>,
    /// When the record reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    /// Versions the in-flight commit attempt will stamp on the accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_versions: Option<AppliedVersions>,
}

impl TransferRecord {
    /// Creates a new PENDING record for a transfer attempt.
    pub fn pending(
        id: TransferId,
        from_account: AccountNumber,
        to_account: AccountNumber,
        amount: Money,
    ) -> Self {
        Self {
            id,
            from_account,
            to_account,
            amount,
            status: TransferStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            failure_reason: None,
            applied_versions: None,
        }
    }

    /// Reconstructs a record from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransferId,
        from_account: AccountNumber,
        to_account: AccountNumber,
        amount: Money,
        status: TransferStatus,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        failure_reason: Option<FailureReason>,
        applied_versions: Option<AppliedVersions>,
    ) -> Self {
        Self {
            id,
            from_account,
            to_account,
            amount,
            status,
            created_at,
            completed_at,
            failure_reason,
            applied_versions,
        }
    }

    /// Marks the transfer COMPLETED. Only valid from PENDING.
    pub fn complete(&self) -> Result<TransferRecord, DomainError> {
        self.transition(TransferStatus::Completed, None)
    }

    /// Marks the transfer FAILED with the given reason. Only valid from PENDING.
    pub fn fail(&self, reason: FailureReason) -> Result<TransferRecord, DomainError> {
        self.transition(TransferStatus::Failed, Some(reason))
    }

    fn transition(
        &self,
        status: TransferStatus,
        reason: Option<FailureReason>,
    ) -> Result<TransferRecord, DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: status,
            });
        }
        let mut updated = self.clone();
        updated.status = status;
        updated.completed_at = Some(Utc::now());
        updated.failure_reason = reason;
        Ok(updated)
    }
}
