//! Position persistence: locked lookups, insert/update/delete, list.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::position::{Category, Position};

const POSITION_COLUMNS: &str = "id, symbol, display_name, category, quantity, avg_price, opened_at";

#[derive(Debug, FromRow)]
pub struct PositionRow {
    pub id: Uuid,
    pub symbol: String,
    pub display_name: String,
    pub category: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub opened_at: DateTime<Utc>,
}

fn position_row_to_position(row: PositionRow) -> Result<Position, StoreError> {
    let category = Category::parse(&row.category).ok_or_else(|| {
        StoreError::Corrupt(format!("position {} has unknown category '{}'", row.id, row.category))
    })?;
    Ok(Position {
        id: row.id,
        symbol: row.symbol,
        display_name: row.display_name,
        category,
        quantity: row.quantity,
        avg_price: row.avg_price,
        opened_at: row.opened_at,
    })
}

/// Lock the open position for `symbol`, if any, until the transaction ends.
pub async fn select_position_by_symbol_for_update(
    conn: &mut PgConnection,
    symbol: &str,
) -> Result<Option<Position>, StoreError> {
    let row = sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions WHERE symbol = $1 FOR UPDATE"
    ))
    .bind(symbol)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(position_row_to_position).transpose()
}

/// Lock the position with `id`, if it exists, until the transaction ends.
pub async fn select_position_by_id_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Position>, StoreError> {
    let row = sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(position_row_to_position).transpose()
}

pub async fn insert_position(conn: &mut PgConnection, position: &Position) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO positions (id, symbol, display_name, category, quantity, avg_price, opened_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(position.id)
    .bind(&position.symbol)
    .bind(&position.display_name)
    .bind(position.category.as_str())
    .bind(position.quantity)
    .bind(position.avg_price)
    .bind(position.opened_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Quantity, average price and opening time are the only mutable columns.
pub async fn update_position(conn: &mut PgConnection, position: &Position) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE positions SET quantity = $1, avg_price = $2, opened_at = $3 WHERE id = $4",
    )
    .bind(position.quantity)
    .bind(position.avg_price)
    .bind(position.opened_at)
    .bind(position.id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!("position {} vanished during update", position.id)));
    }
    Ok(())
}

pub async fn delete_position(conn: &mut PgConnection, id: Uuid) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM positions WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn get_position(pool: &PgPool, id: Uuid) -> Result<Option<Position>, StoreError> {
    let row = sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(position_row_to_position).transpose()
}

/// List all open positions (for GET /api/assets).
pub async fn list_positions(pool: &PgPool) -> Result<Vec<Position>, StoreError> {
    let rows = sqlx::query_as::<_, PositionRow>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions ORDER BY symbol"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(position_row_to_position).collect()
}
