//! # Transfer Types
//!
//! Domain types and port traits for the funds-transfer consistency engine.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, AccountNumber, Account, TransferRecord)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Command and outcome types crossing the engine boundary
//! - `error/` - Domain and store error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountNumber, AccountStatus, AppliedVersions, BankCode, Currency, FailureReason,
    Money, TransferId, TransferRecord, TransferStatus,
};
pub use dto::{TransferCommand, TransferOutcome};
pub use error::{DomainError, StoreError};
pub use ports::{AccountStore, IdGenerator, InsertOutcome, TransferStore};
