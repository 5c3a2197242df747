//! Error taxonomy for the ledger and its store.

use thiserror::Error;

use crate::types::position::{Category, PositionId};

/// Failures of the durable store. Any of these aborts the enclosing operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("store transaction already finished")]
    Finished,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("position not found: {0}")]
    NotFound(PositionId),

    #[error("insufficient quantity: requested {requested}, only {available} units available")]
    InsufficientQuantity { requested: f64, available: f64 },

    #[error("{symbol} is held as {existing}, cannot buy it as {requested}")]
    CategoryMismatch {
        symbol: String,
        existing: Category,
        requested: Category,
    },

    #[error("no usable price for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Storage(StoreError::Database(e))
    }
}
