//! Wallet guard: purchases may not spend more cash than the wallet holds, sale proceeds
//! are credited. Both act on the locked wallet row of the caller's store transaction, so
//! they persist only if that transaction commits.

use tracing::debug;

use crate::error::LedgerError;
use crate::persistence::LedgerTx;

/// Balance left after spending `amount`, or `InsufficientFunds`.
pub fn check_reserve(balance: f64, amount: f64) -> Result<f64, LedgerError> {
    if amount > balance {
        return Err(LedgerError::InsufficientFunds {
            required: amount,
            available: balance,
        });
    }
    Ok(balance - amount)
}

/// Lock the wallet and take `amount` out of it. Returns the new balance.
pub async fn reserve(tx: &mut dyn LedgerTx, amount: f64) -> Result<f64, LedgerError> {
    let balance = tx.lock_wallet().await?;
    let remaining = check_reserve(balance, amount)?;
    tx.set_wallet(remaining).await?;
    debug!(amount, balance, remaining, "reserved funds");
    Ok(remaining)
}

/// Lock the wallet and add `amount` to it. Returns the new balance.
pub async fn credit(tx: &mut dyn LedgerTx, amount: f64) -> Result<f64, LedgerError> {
    let balance = tx.lock_wallet().await?;
    let updated = balance + amount;
    if !updated.is_finite() {
        return Err(LedgerError::Invalid(format!(
            "crediting {amount} to balance {balance} overflows"
        )));
    }
    tx.set_wallet(updated).await?;
    debug!(amount, balance, updated, "credited wallet");
    Ok(updated)
}
