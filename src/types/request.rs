//! Typed requests for the ledger operations and the receipts they return.
//! Validation happens here, before any store transaction is opened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::position::{Category, POSITION_EPSILON, PositionId, normalize_symbol};
use crate::types::transaction::TransactionId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    pub symbol: String,
    pub name: String,
    pub category: Category,
    pub unit_price: f64,
    pub quantity: f64,
    /// Execution time; defaults to now. Allows back-dated entries.
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
}

/// A buy that passed validation: symbol normalized, time resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyOrder {
    pub symbol: String,
    pub name: String,
    pub category: Category,
    pub unit_price: f64,
    pub quantity: f64,
    pub executed_at: DateTime<Utc>,
}

impl BuyOrder {
    pub fn cost(&self) -> f64 {
        self.unit_price * self.quantity
    }
}

impl BuyRequest {
    pub fn validate(self) -> Result<BuyOrder, LedgerError> {
        let symbol = normalize_symbol(&self.symbol);
        if symbol.is_empty() {
            return Err(LedgerError::Invalid("symbol is required".to_string()));
        }
        let name = self.name.trim();
        let name = if name.is_empty() { symbol.clone() } else { name.to_string() };
        ensure_positive("quantity", self.quantity)?;
        ensure_positive("unit price", self.unit_price)?;
        // Anything smaller would open a position that already counts as empty.
        if self.quantity < POSITION_EPSILON {
            return Err(LedgerError::Invalid(format!(
                "quantity must be at least {POSITION_EPSILON}, got {}",
                self.quantity
            )));
        }
        let cost = self.unit_price * self.quantity;
        if !cost.is_finite() {
            return Err(LedgerError::Invalid("total cost is not a finite number".to_string()));
        }
        Ok(BuyOrder {
            symbol,
            name,
            category: self.category,
            unit_price: self.unit_price,
            quantity: self.quantity,
            executed_at: self.executed_at.unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    pub position_id: PositionId,
    pub quantity: f64,
    /// Caller-supplied fill price. When absent the price oracle is asked.
    #[serde(default)]
    pub unit_price: Option<f64>,
}

impl SellRequest {
    pub fn validate(&self) -> Result<(), LedgerError> {
        ensure_positive("quantity", self.quantity)?;
        if let Some(price) = self.unit_price {
            ensure_positive("sale price", price)?;
        }
        Ok(())
    }
}

pub(crate) fn ensure_positive(field: &str, value: f64) -> Result<(), LedgerError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(LedgerError::Invalid(format!(
            "{field} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyReceipt {
    pub position_id: PositionId,
    pub transaction_id: TransactionId,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellStatus {
    Deleted,
    Updated,
}

impl SellStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellStatus::Deleted => "deleted",
            SellStatus::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellReceipt {
    pub status: SellStatus,
    pub position_id: PositionId,
    pub transaction_id: TransactionId,
    pub unit_price: f64,
    pub remaining_quantity: f64,
    pub balance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn buy(quantity: f64, unit_price: f64) -> BuyRequest {
        BuyRequest {
            symbol: " msft ".to_string(),
            name: String::new(),
            category: Category::Stocks,
            unit_price,
            quantity,
            executed_at: None,
        }
    }

    #[test]
    fn buy_validation_normalizes_symbol_and_defaults_name() {
        let order = buy(2.0, 10.0).validate().unwrap();
        assert_eq!(order.symbol, "MSFT");
        assert_eq!(order.name, "MSFT");
        assert_eq!(order.cost(), 20.0);
    }

    #[test]
    fn buy_validation_rejects_zero_negative_and_nan() {
        assert!(matches!(buy(0.0, 10.0).validate(), Err(LedgerError::Invalid(_))));
        assert!(matches!(buy(1.0, -1.0).validate(), Err(LedgerError::Invalid(_))));
        assert!(matches!(buy(f64::NAN, 1.0).validate(), Err(LedgerError::Invalid(_))));
        assert!(matches!(buy(f64::MAX, f64::MAX).validate(), Err(LedgerError::Invalid(_))));
    }

    #[test]
    fn buy_validation_rejects_quantity_below_position_epsilon() {
        assert!(matches!(buy(5e-5, 10.0).validate(), Err(LedgerError::Invalid(_))));
        assert!(buy(POSITION_EPSILON, 10.0).validate().is_ok());
    }

    #[test]
    fn buy_validation_rejects_blank_symbol() {
        let mut req = buy(1.0, 1.0);
        req.symbol = "   ".to_string();
        assert!(matches!(req.validate(), Err(LedgerError::Invalid(_))));
    }

    #[test]
    fn sell_validation_checks_optional_price() {
        let id = Uuid::new_v4();
        let ok = SellRequest { position_id: id, quantity: 1.0, unit_price: None };
        assert!(ok.validate().is_ok());
        let bad = SellRequest { position_id: id, quantity: 1.0, unit_price: Some(0.0) };
        assert!(matches!(bad.validate(), Err(LedgerError::Invalid(_))));
    }
}
