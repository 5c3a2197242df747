//! Transaction log persistence: append and list. Rows are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::position::Category;
use crate::types::transaction::{NewTransaction, Transaction, TransactionKind};

#[derive(Debug, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub seq: i64,
    pub symbol: String,
    pub asset_name: String,
    pub category: String,
    pub kind: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub executed_at: DateTime<Utc>,
}

fn transaction_row_to_transaction(row: TransactionRow) -> Result<Transaction, StoreError> {
    let category = Category::parse(&row.category).ok_or_else(|| {
        StoreError::Corrupt(format!("transaction {} has unknown category '{}'", row.id, row.category))
    })?;
    let kind = TransactionKind::parse(&row.kind).ok_or_else(|| {
        StoreError::Corrupt(format!("transaction {} has unknown kind '{}'", row.id, row.kind))
    })?;
    Ok(Transaction {
        id: row.id,
        seq: row.seq,
        symbol: row.symbol,
        asset_name: row.asset_name,
        category,
        kind,
        unit_price: row.unit_price,
        quantity: row.quantity,
        executed_at: row.executed_at,
    })
}

/// Insert a single entry; returns the sequence number the database assigned.
pub async fn insert_transaction(
    conn: &mut PgConnection,
    entry: &NewTransaction,
) -> Result<i64, StoreError> {
    let seq: i64 = sqlx::query_scalar(
        "INSERT INTO transactions (id, symbol, asset_name, category, kind, unit_price, quantity, executed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING seq",
    )
    .bind(entry.id)
    .bind(&entry.symbol)
    .bind(&entry.asset_name)
    .bind(entry.category.as_str())
    .bind(entry.kind.as_str())
    .bind(entry.unit_price)
    .bind(entry.quantity)
    .bind(entry.executed_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(seq)
}

/// List the whole log in creation order.
pub async fn list_transactions(pool: &PgPool) -> Result<Vec<Transaction>, StoreError> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT id, seq, symbol, asset_name, category, kind, unit_price, quantity, executed_at \
         FROM transactions ORDER BY seq",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(transaction_row_to_transaction).collect()
}
