//! Commerce error types.

use thiserror::Error;

/// Errors raised by the domain types themselves.
///
/// Lookups and authorization live in the service layer; these are the
/// rules a value can enforce on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommerceError {
    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// A status change the state machine does not allow.
    #[error("Illegal {entity} transition from {from} to {to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// A wallet operation would break a balance invariant.
    #[error("Ledger invariant violated: {0}")]
    LedgerInvariant(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}
