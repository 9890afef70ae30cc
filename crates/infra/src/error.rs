use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use stockledger_core::DomainError;
use stockledger_inventory::StreamKey;

/// Stock ledger operation error.
///
/// These are returned to the caller as values; the ledger never retries on
/// its own. [`LedgerError::is_retryable`] tells the caller which ones are
/// worth a retry with backoff.
///
/// ## Error Categories
///
/// - **Validation**: malformed request (zero quantity, nil identifiers, ...)
/// - **LockTimeout**: the stream lock was not acquired within the configured wait
/// - **Persistence**: the unit of work could not commit; nothing was written
/// - **NotFound**: the requested movement or stream does not exist
/// - **Conflict**: the request contradicts recorded history (double reversal)
/// - **InsufficientStock**: rejected by the negative-stock policy
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("timed out after {waited:?} waiting for stream lock {key}")]
    LockTimeout { key: StreamKey, waited: Duration },

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock on {key}: available {available}, requested {requested}")]
    InsufficientStock {
        key: StreamKey,
        available: Decimal,
        requested: Decimal,
    },

    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::LockTimeout { .. } | LedgerError::Persistence(_))
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::InvariantViolation(msg) => LedgerError::InvariantViolation(msg),
            DomainError::NotFound(msg) => LedgerError::NotFound(msg),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
        }
    }
}
