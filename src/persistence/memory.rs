//! In-memory ledger store, used when no database is configured and in tests.
//!
//! Writers queue on a single async mutex and work on a private copy of the committed
//! state; `commit` publishes that copy in one swap. Readers clone the last published
//! snapshot and never wait for a writer to finish.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::StoreError;
use crate::persistence::{LedgerStore, LedgerTx};
use crate::types::position::{Position, PositionId};
use crate::types::transaction::{NewTransaction, Transaction};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    wallet: Option<f64>,
    positions: BTreeMap<PositionId, Position>,
    transactions: Vec<Transaction>,
    next_seq: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    writer: Arc<Mutex<()>>,
    committed: Arc<RwLock<Arc<LedgerState>>>,
}

impl MemoryStore {
    /// Empty store without a wallet row; call `seed_wallet` before trading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose wallet row already holds `balance`.
    pub fn with_balance(balance: f64) -> Self {
        let state = LedgerState {
            wallet: Some(balance),
            ..LedgerState::default()
        };
        Self {
            writer: Arc::new(Mutex::new(())),
            committed: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    async fn snapshot(&self) -> Arc<LedgerState> {
        self.committed.read().await.clone()
    }
}

fn missing_wallet() -> StoreError {
    StoreError::Corrupt("wallet row is missing".to_string())
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let guard = self.writer.clone().lock_owned().await;
        let staged = LedgerState::clone(&*self.snapshot().await);
        Ok(Box::new(MemoryTx {
            _guard: guard,
            staged,
            committed: self.committed.clone(),
            finished: false,
        }))
    }

    async fn seed_wallet(&self, initial: f64) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        let mut committed = self.committed.write().await;
        if committed.wallet.is_none() {
            let mut next = LedgerState::clone(&committed);
            next.wallet = Some(initial);
            *committed = Arc::new(next);
        }
        Ok(())
    }

    async fn wallet_balance(&self) -> Result<f64, StoreError> {
        self.snapshot().await.wallet.ok_or_else(missing_wallet)
    }

    async fn get_position(&self, id: PositionId) -> Result<Option<Position>, StoreError> {
        Ok(self.snapshot().await.positions.get(&id).cloned())
    }

    async fn list_positions(&self) -> Result<Vec<Position>, StoreError> {
        let snapshot = self.snapshot().await;
        let mut positions: Vec<Position> = snapshot.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.snapshot().await.transactions.clone())
    }
}

pub struct MemoryTx {
    _guard: OwnedMutexGuard<()>,
    staged: LedgerState,
    committed: Arc<RwLock<Arc<LedgerState>>>,
    finished: bool,
}

impl MemoryTx {
    fn state(&mut self) -> Result<&mut LedgerState, StoreError> {
        if self.finished {
            return Err(StoreError::Finished);
        }
        Ok(&mut self.staged)
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_wallet(&mut self) -> Result<f64, StoreError> {
        self.state()?.wallet.ok_or_else(missing_wallet)
    }

    async fn set_wallet(&mut self, balance: f64) -> Result<(), StoreError> {
        let state = self.state()?;
        if state.wallet.is_none() {
            return Err(missing_wallet());
        }
        if balance < 0.0 {
            return Err(StoreError::Conflict(format!("wallet balance {balance} below zero")));
        }
        state.wallet = Some(balance);
        Ok(())
    }

    async fn position_by_symbol(&mut self, symbol: &str) -> Result<Option<Position>, StoreError> {
        Ok(self
            .state()?
            .positions
            .values()
            .find(|p| p.symbol == symbol)
            .cloned())
    }

    async fn position_by_id(&mut self, id: PositionId) -> Result<Option<Position>, StoreError> {
        Ok(self.state()?.positions.get(&id).cloned())
    }

    async fn insert_position(&mut self, position: &Position) -> Result<(), StoreError> {
        let state = self.state()?;
        if state.positions.contains_key(&position.id)
            || state.positions.values().any(|p| p.symbol == position.symbol)
        {
            return Err(StoreError::Conflict(format!(
                "position for {} already exists",
                position.symbol
            )));
        }
        state.positions.insert(position.id, position.clone());
        Ok(())
    }

    async fn update_position(&mut self, position: &Position) -> Result<(), StoreError> {
        let state = self.state()?;
        match state.positions.get_mut(&position.id) {
            Some(existing) => {
                existing.quantity = position.quantity;
                existing.avg_price = position.avg_price;
                existing.opened_at = position.opened_at;
                Ok(())
            }
            None => Err(StoreError::Conflict(format!(
                "position {} vanished during update",
                position.id
            ))),
        }
    }

    async fn delete_position(&mut self, id: PositionId) -> Result<(), StoreError> {
        self.state()?.positions.remove(&id);
        Ok(())
    }

    async fn insert_transaction(&mut self, entry: &NewTransaction) -> Result<i64, StoreError> {
        let state = self.state()?;
        state.next_seq += 1;
        let seq = state.next_seq;
        state.transactions.push(entry.clone().into_recorded(seq));
        Ok(seq)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Finished);
        }
        self.finished = true;
        let staged = std::mem::take(&mut self.staged);
        *self.committed.write().await = Arc::new(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::position::Category;
    use chrono::Utc;
    use uuid::Uuid;

    fn position(symbol: &str) -> Position {
        Position {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            display_name: symbol.to_string(),
            category: Category::Stocks,
            quantity: 1.0,
            avg_price: 10.0,
            opened_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_tx_leaves_committed_state_untouched() {
        let store = MemoryStore::with_balance(100.0);
        {
            let mut tx = store.begin().await.unwrap();
            tx.set_wallet(50.0).await.unwrap();
            tx.insert_position(&position("AAPL")).await.unwrap();
        }
        assert_eq!(store.wallet_balance().await.unwrap(), 100.0);
        assert!(store.list_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_publishes_all_staged_changes() {
        let store = MemoryStore::with_balance(100.0);
        let mut tx = store.begin().await.unwrap();
        tx.set_wallet(40.0).await.unwrap();
        tx.insert_position(&position("AAPL")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.wallet_balance().await.unwrap(), 40.0);
        assert_eq!(store.list_positions().await.unwrap().len(), 1);
        assert!(matches!(tx.commit().await, Err(StoreError::Finished)));
    }

    #[tokio::test]
    async fn readers_see_last_commit_while_writer_is_open() {
        let store = MemoryStore::with_balance(100.0);
        let mut tx = store.begin().await.unwrap();
        tx.set_wallet(1.0).await.unwrap();
        assert_eq!(store.wallet_balance().await.unwrap(), 100.0);
        tx.commit().await.unwrap();
        assert_eq!(store.wallet_balance().await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn duplicate_symbol_insert_is_a_conflict() {
        let store = MemoryStore::with_balance(0.0);
        let mut tx = store.begin().await.unwrap();
        tx.insert_position(&position("GLD")).await.unwrap();
        let err = tx.insert_position(&position("GLD")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn seed_wallet_never_overwrites() {
        let store = MemoryStore::new();
        assert!(store.wallet_balance().await.is_err());
        store.seed_wallet(500.0).await.unwrap();
        store.seed_wallet(9.0).await.unwrap();
        assert_eq!(store.wallet_balance().await.unwrap(), 500.0);
    }

    #[tokio::test]
    async fn transaction_seq_increases_in_creation_order() {
        let store = MemoryStore::with_balance(0.0);
        let mut tx = store.begin().await.unwrap();
        let entry = NewTransaction {
            id: Uuid::new_v4(),
            symbol: "AAPL".to_string(),
            asset_name: "Apple".to_string(),
            category: Category::Stocks,
            kind: crate::types::transaction::TransactionKind::Buy,
            unit_price: 1.0,
            quantity: 1.0,
            executed_at: Utc::now(),
        };
        let first = tx.insert_transaction(&entry).await.unwrap();
        let second = tx.insert_transaction(&entry).await.unwrap();
        tx.commit().await.unwrap();
        assert!(second > first);
        assert_eq!(store.list_transactions().await.unwrap().len(), 2);
    }
}
