//! Transfer id generation port.

use crate::domain::TransferId;

/// Produces unique transfer identifiers. Used only when the caller does
/// not supply an idempotency key of its own.
pub trait IdGenerator: Send + Sync + 'static {
    fn next(&self) -> TransferId;
}
