//! Error types for the fuelbank ledger

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot subtract {requested} points: balance is only {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("group '{0}' has no members")]
    NoMembers(String),

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// True when a unique constraint was violated, e.g. a duplicate group name.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            LedgerError::Storage(e) => {
                e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
            }
            _ => false,
        }
    }
}
