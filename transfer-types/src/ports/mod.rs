//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The coordinator depends on these traits, not concrete implementations.

mod id_generator;
mod stores;

pub use id_generator::IdGenerator;
pub use stores::{AccountStore, InsertOutcome, TransferStore};
