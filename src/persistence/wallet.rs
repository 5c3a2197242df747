//! Wallet persistence. Exactly one row, id = 1.

use sqlx::{PgConnection, PgPool};

use crate::error::StoreError;

const WALLET_ID: i16 = 1;

/// Insert the wallet row unless it already exists.
pub async fn seed_wallet(pool: &PgPool, initial: f64) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO wallet (id, balance) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
        .bind(WALLET_ID)
        .bind(initial)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_wallet_balance(pool: &PgPool) -> Result<f64, StoreError> {
    let balance: Option<f64> = sqlx::query_scalar("SELECT balance FROM wallet WHERE id = $1")
        .bind(WALLET_ID)
        .fetch_optional(pool)
        .await?;
    balance.ok_or_else(|| StoreError::Corrupt("wallet row is missing".to_string()))
}

/// Read the balance and hold the row lock until the transaction ends.
pub async fn lock_wallet(conn: &mut PgConnection) -> Result<f64, StoreError> {
    let balance: Option<f64> =
        sqlx::query_scalar("SELECT balance FROM wallet WHERE id = $1 FOR UPDATE")
            .bind(WALLET_ID)
            .fetch_optional(&mut *conn)
            .await?;
    balance.ok_or_else(|| StoreError::Corrupt("wallet row is missing".to_string()))
}

pub async fn set_wallet_balance(conn: &mut PgConnection, balance: f64) -> Result<(), StoreError> {
    sqlx::query("UPDATE wallet SET balance = $1 WHERE id = $2")
        .bind(balance)
        .bind(WALLET_ID)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
