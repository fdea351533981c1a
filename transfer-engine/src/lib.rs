//! # Transfer Engine
//!
//! The funds-transfer consistency engine: loads two account aggregates,
//! validates the operation, atomically debits one and credits the other,
//! and durably records the outcome as an immutable transfer record.
//!
//! ## Architecture
//!
//! - `coordinator/` - the `TransferCoordinator` application service
//!
//! The coordinator is generic over the `AccountStore` / `TransferStore` /
//! `IdGenerator` ports, allowing different store implementations to be
//! injected. It assumes nothing about where the two accounts live: no
//! cross-aggregate transaction is ever required, only per-account
//! compare-and-swap.

pub mod coordinator;


pub use coordinator::{TransferCoordinator, TransferError, TransferPolicy, UuidIdGenerator};
