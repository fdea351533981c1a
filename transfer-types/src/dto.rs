//! Command and outcome types crossing the engine boundary.
//!
//! No wire format is mandated here; callers pass and receive plain domain
//! values. The serde derives exist for whatever transport the (out of
//! scope) request layer chooses.

use serde::{Deserialize, Serialize};

use crate::domain::{AccountNumber, FailureReason, Money, TransferId, TransferStatus};

/// Request to move money between two accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    /// Source account
    pub from_account: AccountNumber,
    /// Destination account
    pub to_account: AccountNumber,
    /// Amount to move
    pub amount: Money,
    /// Idempotency key; generated when absent. Callers MUST supply the
    /// same id when retrying a logically-identical request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<TransferId>,
}

/// Terminal (or stored) outcome of a transfer execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub transfer_id: TransferId,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
}

impl TransferOutcome {
    /// Projects a stored record onto the boundary outcome shape.
    pub fn from_record(record: &crate::domain::TransferRecord) -> Self {
        Self {
            transfer_id: record.id,
            status: record.status,
            failure_reason: record.failure_reason,
        }
    }
}
