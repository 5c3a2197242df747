//! Portfolio ledger: positions, a cash wallet and an append-only transaction log, kept
//! consistent across concurrent buys and sells.

pub mod alerts;
pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod persistence;
pub mod positions;
pub mod recorder;
pub mod types;
pub mod valuation;
pub mod wallet;

pub use error::{LedgerError, StoreError};
pub use ledger::Ledger;
