//! Ledger error taxonomy shared by the core, the stores and the API layer.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::types::order::Qty;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Every way a ledger operation can fail.
///
/// Business-rule variants (`InsufficientFunds`, `InsufficientShares`,
/// `NoSuchHolding`) are always raised before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient funds: need {need}, available {available}")]
    InsufficientFunds { need: Decimal, available: Decimal },

    #[error("insufficient shares of {symbol}: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: String,
        requested: Qty,
        held: Qty,
    },

    #[error("no holding for symbol {symbol}")]
    NoSuchHolding { symbol: String },

    #[error("user {0} not found")]
    UnknownUser(Uuid),

    #[error("username {0} is already taken")]
    UsernameTaken(String),

    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl LedgerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }

    /// Only transient storage conflicts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::TransactionConflict(_))
    }

    /// Short machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InsufficientShares { .. } => "insufficient_shares",
            LedgerError::NoSuchHolding { .. } => "no_such_holding",
            LedgerError::UnknownUser(_) => "unknown_user",
            LedgerError::UsernameTaken(_) => "username_taken",
            LedgerError::TransactionConflict(_) => "transaction_conflict",
            LedgerError::StorageFailure(_) => "storage_failure",
        }
    }
}

// SQLSTATE serialization_failure and deadlock_detected.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err
                .code()
                .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code.as_ref()))
            {
                return LedgerError::TransactionConflict(db_err.message().to_string());
            }
        }
        LedgerError::StorageFailure(err.to_string())
    }
}
