//! Error types for the funds-transfer engine.

use crate::domain::{AccountNumber, AccountStatus, Currency, TransferStatus};

/// Domain-level errors (business rule violations).
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error("Transfer amount must be positive")]
    NonPositiveAmount,

    #[error("Cannot transfer between an account and itself")]
    SameAccountTransfer,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Amount arithmetic overflowed")]
    AmountOverflow,

    #[error("Balance cannot be negative")]
    NegativeBalance,

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Account {account} is {status} and cannot take part in a transfer")]
    AccountNotActive {
        account: AccountNumber,
        status: AccountStatus,
    },

    #[error("Transfer id reused with different parameters")]
    TransferIdReused,

    #[error("Unknown bank code: {0}")]
    UnknownBankCode(String),

    #[error("Invalid account number: {0}")]
    InvalidAccountNumber(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: TransferStatus,
        to: TransferStatus,
    },
}

/// Store-level errors (data access failures).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found")]
    NotFound,

    #[error("Version conflict: a concurrent mutation raced ahead")]
    VersionConflict,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
