use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::position::Category;

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "buy",
            TransactionKind::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(TransactionKind::Buy),
            "sell" => Some(TransactionKind::Sell),
            _ => None,
        }
    }
}

/// Immutable ledger entry. Name, category and price are copied at execution time so the
/// entry stays meaningful after the position it touched is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    /// Store-assigned creation order; replay follows this, display follows `executed_at`.
    pub seq: i64,
    pub symbol: String,
    pub asset_name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub unit_price: f64,
    pub quantity: f64,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn amount(&self) -> f64 {
        self.unit_price * self.quantity
    }
}

/// A ledger entry before the store has assigned its creation sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub id: TransactionId,
    pub symbol: String,
    pub asset_name: String,
    pub category: Category,
    pub kind: TransactionKind,
    pub unit_price: f64,
    pub quantity: f64,
    pub executed_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn into_recorded(self, seq: i64) -> Transaction {
        Transaction {
            id: self.id,
            seq,
            symbol: self.symbol,
            asset_name: self.asset_name,
            category: self.category,
            kind: self.kind,
            unit_price: self.unit_price,
            quantity: self.quantity,
            executed_at: self.executed_at,
        }
    }
}

/// Sort newest first; equal timestamps fall back to reverse creation order.
pub fn sort_for_display(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.executed_at
            .cmp(&a.executed_at)
            .then_with(|| b.seq.cmp(&a.seq))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(seq: i64, day: u32) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            seq,
            symbol: "AAPL".to_string(),
            asset_name: "Apple".to_string(),
            category: Category::Stocks,
            kind: TransactionKind::Buy,
            unit_price: 100.0,
            quantity: 1.0,
            executed_at: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn display_order_is_newest_first_then_latest_seq() {
        let mut list = vec![entry(1, 1), entry(2, 5), entry(3, 5), entry(4, 2)];
        sort_for_display(&mut list);
        let seqs: Vec<i64> = list.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![3, 2, 4, 1]);
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let json = serde_json::to_value(entry(1, 1)).unwrap();
        assert_eq!(json["type"], "buy");
        assert_eq!(json["assetName"], "Apple");
    }
}
