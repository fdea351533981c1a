//! Account aggregate.

use serde::{Deserialize, Serialize};

use super::account_number::AccountNumber;
use super::money::Money;
use crate::error::DomainError;

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Normal,
    Stopped,
    Closed,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Normal => write!(f, "NORMAL"),
            AccountStatus::Stopped => write!(f, "STOPPED"),
            AccountStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A bank account aggregate holding identity, status and balance.
///
/// Mutations never happen in place: `debit` and `credit` return a new
/// `Account` with the version bumped, and the `version` field is the
/// optimistic concurrency token that `AccountStore::compare_and_swap`
/// checks on persist. The invariant `balance >= 0` holds for every value
/// this type ever produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Identity; aggregate equality is by this field only
    pub id: AccountNumber,
    /// Lifecycle status
    pub status: AccountStatus,
    /// Current balance (includes currency information)
    pub balance: Money,
    /// Optimistic concurrency token, bumped on every successful mutation
    pub version: u64,
}

impl Account {
    /// Creates an open account with the given starting balance.
    pub fn open(id: AccountNumber, balance: Money) -> Result<Self, DomainError> {
        if balance.is_negative() {
            return Err(DomainError::NegativeBalance);
        }
        Ok(Self {
            id,
            status: AccountStatus::Normal,
            balance,
            version: 0,
        })
    }

    /// Reconstructs an account from stored fields.
    pub fn from_parts(
        id: AccountNumber,
        status: AccountStatus,
        balance: Money,
        version: u64,
    ) -> Self {
        Self {
            id,
            status,
            balance,
            version,
        }
    }

    /// True when both values name the same account, regardless of balance.
    pub fn same_account(&self, other: &Account) -> bool {
        self.id == other.id
    }

    /// Debits (subtracts) money, returning the updated account.
    ///
    /// Only NORMAL accounts can be debited, and never below zero.
    pub fn debit(&self, amount: Money) -> Result<Account, DomainError> {
        if self.status != AccountStatus::Normal {
            return Err(DomainError::AccountNotActive {
                account: self.id.clone(),
                status: self.status,
            });
        }
        if !self.balance.gte(&amount)? {
            return Err(DomainError::InsufficientFunds {
                available: self.balance.amount(),
                requested: amount.amount(),
            });
        }
        Ok(Account {
            id: self.id.clone(),
            status: self.status,
            balance: self.balance.checked_sub(amount)?,
            version: self.version + 1,
        })
    }

    /// Credits (adds) money, returning the updated account.
    ///
    /// CLOSED accounts reject credit. Whether STOPPED accounts accept it
    /// is a policy decision made by the coordinator, not here.
    pub fn credit(&self, amount: Money) -> Result<Account, DomainError> {
        if self.status == AccountStatus::Closed {
            return Err(DomainError::AccountNotActive {
                account: self.id.clone(),
                status: self.status,
            });
        }
        Ok(Account {
            id: self.id.clone(),
            status: self.status,
            balance: self.balance.checked_add(amount)?,
            version: self.version + 1,
        })
    }
}
