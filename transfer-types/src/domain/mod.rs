//! Domain models for the funds-transfer engine.

pub mod account;
pub mod account_number;
pub mod money;
pub mod transfer;

pub use account::{Account, AccountStatus};
pub use account_number::{AccountNumber, BankCode};
pub use money::{Currency, Money};
pub use transfer::{AppliedVersions, FailureReason, TransferId, TransferRecord, TransferStatus};
