//! Ledger store: the wallet row, open positions and the transaction log.
//!
//! Writes go through a [`LedgerTx`]. Every read inside a transaction locks what it returns
//! until commit, always wallet first and position second. Dropping a transaction without
//! committing discards everything it staged.

mod memory;
mod pool;
mod positions;
mod postgres;
mod transactions;
mod wallet;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::position::{Position, PositionId};
use crate::types::transaction::{NewTransaction, Transaction};

pub use memory::MemoryStore;
pub use pool::{create_pool_and_migrate, run_migrations};
pub use postgres::PgLedgerStore;
pub use sqlx::PgPool;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    /// Create the wallet row with `initial` if it does not exist yet. Never overwrites.
    async fn seed_wallet(&self, initial: f64) -> Result<(), StoreError>;

    async fn wallet_balance(&self) -> Result<f64, StoreError>;

    /// Unlocked read of one position.
    async fn get_position(&self, id: PositionId) -> Result<Option<Position>, StoreError>;

    /// Open positions, ordered by symbol.
    async fn list_positions(&self) -> Result<Vec<Position>, StoreError>;

    /// The whole log in creation order.
    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError>;
}

#[async_trait]
pub trait LedgerTx: Send {
    async fn lock_wallet(&mut self) -> Result<f64, StoreError>;

    async fn set_wallet(&mut self, balance: f64) -> Result<(), StoreError>;

    async fn position_by_symbol(&mut self, symbol: &str) -> Result<Option<Position>, StoreError>;

    async fn position_by_id(&mut self, id: PositionId) -> Result<Option<Position>, StoreError>;

    async fn insert_position(&mut self, position: &Position) -> Result<(), StoreError>;

    async fn update_position(&mut self, position: &Position) -> Result<(), StoreError>;

    async fn delete_position(&mut self, id: PositionId) -> Result<(), StoreError>;

    /// Append to the log; returns the creation sequence the store assigned.
    async fn insert_transaction(&mut self, entry: &NewTransaction) -> Result<i64, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;
}
