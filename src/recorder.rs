//! Transaction recorder. Appends one immutable entry per executed buy or sell inside the
//! caller's store transaction; storage errors propagate unchanged.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::persistence::LedgerTx;
use crate::types::position::Position;
use crate::types::transaction::{NewTransaction, Transaction, TransactionKind};

/// Record a fill against `position`, copying its name and category into the entry.
pub async fn record(
    tx: &mut dyn LedgerTx,
    position: &Position,
    kind: TransactionKind,
    unit_price: f64,
    quantity: f64,
    executed_at: DateTime<Utc>,
) -> Result<Transaction, StoreError> {
    let entry = NewTransaction {
        id: Uuid::new_v4(),
        symbol: position.symbol.clone(),
        asset_name: position.display_name.clone(),
        category: position.category,
        kind,
        unit_price,
        quantity,
        executed_at,
    };
    let seq = tx.insert_transaction(&entry).await?;
    Ok(entry.into_recorded(seq))
}
