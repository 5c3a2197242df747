//! PostgreSQL-backed ledger store. Row locks come from `SELECT ... FOR UPDATE`; rollback
//! happens when the sqlx transaction is dropped uncommitted.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres};

use crate::error::StoreError;
use crate::persistence::{LedgerStore, LedgerTx, positions, transactions, wallet};
use crate::types::position::{Position, PositionId};
use crate::types::transaction::{NewTransaction, Transaction};

#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx: Some(tx) }))
    }

    async fn seed_wallet(&self, initial: f64) -> Result<(), StoreError> {
        wallet::seed_wallet(&self.pool, initial).await
    }

    async fn wallet_balance(&self) -> Result<f64, StoreError> {
        wallet::get_wallet_balance(&self.pool).await
    }

    async fn get_position(&self, id: PositionId) -> Result<Option<Position>, StoreError> {
        positions::get_position(&self.pool, id).await
    }

    async fn list_positions(&self) -> Result<Vec<Position>, StoreError> {
        positions::list_positions(&self.pool).await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        transactions::list_transactions(&self.pool).await
    }
}

pub struct PgLedgerTx {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgLedgerTx {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(StoreError::Finished),
        }
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_wallet(&mut self) -> Result<f64, StoreError> {
        wallet::lock_wallet(self.conn()?).await
    }

    async fn set_wallet(&mut self, balance: f64) -> Result<(), StoreError> {
        wallet::set_wallet_balance(self.conn()?, balance).await
    }

    async fn position_by_symbol(&mut self, symbol: &str) -> Result<Option<Position>, StoreError> {
        positions::select_position_by_symbol_for_update(self.conn()?, symbol).await
    }

    async fn position_by_id(&mut self, id: PositionId) -> Result<Option<Position>, StoreError> {
        positions::select_position_by_id_for_update(self.conn()?, id).await
    }

    async fn insert_position(&mut self, position: &Position) -> Result<(), StoreError> {
        positions::insert_position(self.conn()?, position).await
    }

    async fn update_position(&mut self, position: &Position) -> Result<(), StoreError> {
        positions::update_position(self.conn()?, position).await
    }

    async fn delete_position(&mut self, id: PositionId) -> Result<(), StoreError> {
        positions::delete_position(self.conn()?, id).await
    }

    async fn insert_transaction(&mut self, entry: &NewTransaction) -> Result<i64, StoreError> {
        transactions::insert_transaction(self.conn()?, entry).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await?;
        Ok(())
    }
}
