//! Position reconciler: merge_buy, reduce_sell, replay, unrealized_pnl.
//! The arithmetic is pure and testable without a store; `reconcile_*` persist the result
//! through the caller's store transaction.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::persistence::LedgerTx;
use crate::types::position::{Category, POSITION_EPSILON, Position};
use crate::types::request::BuyOrder;
use crate::types::transaction::{Transaction, TransactionKind};

#[derive(Debug, Clone, PartialEq)]
pub enum BuyEffect {
    Opened(Position),
    Merged(Position),
}

impl BuyEffect {
    pub fn position(&self) -> &Position {
        match self {
            BuyEffect::Opened(p) | BuyEffect::Merged(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SellEffect {
    /// Nothing meaningful left; the position row goes away.
    Closed(Position),
    Reduced(Position),
}

impl SellEffect {
    pub fn position(&self) -> &Position {
        match self {
            SellEffect::Closed(p) | SellEffect::Reduced(p) => p,
        }
    }

    pub fn remaining_quantity(&self) -> f64 {
        match self {
            SellEffect::Closed(_) => 0.0,
            SellEffect::Reduced(p) => p.quantity,
        }
    }
}

/// Quantity-weighted blend of the held average and the new fill price.
pub fn weighted_average(old_qty: f64, old_avg: f64, add_qty: f64, add_price: f64) -> f64 {
    (old_avg * old_qty + add_price * add_qty) / (old_qty + add_qty)
}

/// Open a position or merge the buy into the held one. Symbol and category never change.
pub fn merge_buy(existing: Option<&Position>, order: &BuyOrder) -> Result<BuyEffect, LedgerError> {
    let Some(held) = existing else {
        return Ok(BuyEffect::Opened(Position {
            id: Uuid::new_v4(),
            symbol: order.symbol.clone(),
            display_name: order.name.clone(),
            category: order.category,
            quantity: order.quantity,
            avg_price: order.unit_price,
            opened_at: order.executed_at,
        }));
    };

    if held.category != order.category {
        return Err(LedgerError::CategoryMismatch {
            symbol: held.symbol.clone(),
            existing: held.category,
            requested: order.category,
        });
    }

    let mut merged = held.clone();
    merged.avg_price = weighted_average(held.quantity, held.avg_price, order.quantity, order.unit_price);
    merged.quantity = held.quantity + order.quantity;
    merged.opened_at = held.opened_at.min(order.executed_at);
    Ok(BuyEffect::Merged(merged))
}

/// Take `quantity` units off a position. The check is strict; only the leftover is
/// compared against the epsilon. Average price per unit is unaffected by a sale.
pub fn reduce_sell(position: &Position, quantity: f64) -> Result<SellEffect, LedgerError> {
    if quantity > position.quantity {
        return Err(LedgerError::InsufficientQuantity {
            requested: quantity,
            available: position.quantity,
        });
    }
    let remaining = position.quantity - quantity;
    if remaining < POSITION_EPSILON {
        return Ok(SellEffect::Closed(position.clone()));
    }
    let mut reduced = position.clone();
    reduced.quantity = remaining;
    Ok(SellEffect::Reduced(reduced))
}

/// Apply a validated buy to the (locked) position for its symbol and persist it.
pub async fn reconcile_buy(tx: &mut dyn LedgerTx, order: &BuyOrder) -> Result<BuyEffect, LedgerError> {
    let existing = tx.position_by_symbol(&order.symbol).await?;
    let effect = merge_buy(existing.as_ref(), order)?;
    match &effect {
        BuyEffect::Opened(p) => tx.insert_position(p).await?,
        BuyEffect::Merged(p) => tx.update_position(p).await?,
    }
    Ok(effect)
}

/// Apply a sale to an already locked position and persist it.
pub async fn reconcile_sell(
    tx: &mut dyn LedgerTx,
    position: &Position,
    quantity: f64,
) -> Result<SellEffect, LedgerError> {
    let effect = reduce_sell(position, quantity)?;
    match &effect {
        SellEffect::Closed(p) => tx.delete_position(p.id).await?,
        SellEffect::Reduced(p) => tx.update_position(p).await?,
    }
    Ok(effect)
}

/// Unrealized gain/loss: (current_price - avg_price) * quantity.
pub fn unrealized_pnl(position: &Position, current_price: f64) -> f64 {
    (current_price - position.avg_price) * position.quantity
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayedPosition {
    pub symbol: String,
    pub category: Category,
    pub quantity: f64,
    pub avg_price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Replay {
    pub positions: BTreeMap<String, ReplayedPosition>,
    /// Log entries that could not be applied (sell of an unheld or oversold symbol).
    pub anomalies: Vec<String>,
}

/// Rebuild open positions from the log in creation order, with the same rules the
/// live reconciler uses.
pub fn replay(transactions: &[Transaction]) -> Replay {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| t.seq);

    let mut out = Replay::default();
    for t in ordered {
        match t.kind {
            TransactionKind::Buy => {
                let entry = out
                    .positions
                    .entry(t.symbol.clone())
                    .or_insert_with(|| ReplayedPosition {
                        symbol: t.symbol.clone(),
                        category: t.category,
                        quantity: 0.0,
                        avg_price: t.unit_price,
                    });
                entry.avg_price = weighted_average(entry.quantity, entry.avg_price, t.quantity, t.unit_price);
                entry.quantity += t.quantity;
            }
            TransactionKind::Sell => {
                let Some(entry) = out.positions.get_mut(&t.symbol) else {
                    out.anomalies.push(format!("seq {}: sell of {} with no open position", t.seq, t.symbol));
                    continue;
                };
                if t.quantity > entry.quantity {
                    out.anomalies.push(format!(
                        "seq {}: sold {} {} but only {} held",
                        t.seq, t.quantity, t.symbol, entry.quantity
                    ));
                }
                entry.quantity -= t.quantity;
                if entry.quantity < POSITION_EPSILON {
                    out.positions.remove(&t.symbol);
                }
            }
        }
    }
    out
}

/// Find positions whose stored state disagrees with the replayed log.
pub fn drift(stored: &[Position], replayed: &Replay, tolerance: f64) -> Vec<String> {
    let mut issues = Vec::new();
    for p in stored {
        match replayed.positions.get(&p.symbol) {
            None => issues.push(format!("{} is open but the log says it was closed", p.symbol)),
            Some(r) => {
                if (r.quantity - p.quantity).abs() > tolerance {
                    issues.push(format!("{} quantity {} vs log {}", p.symbol, p.quantity, r.quantity));
                }
                if (r.avg_price - p.avg_price).abs() > tolerance * p.avg_price.max(1.0) {
                    issues.push(format!("{} average {} vs log {}", p.symbol, p.avg_price, r.avg_price));
                }
            }
        }
    }
    let held: Vec<&str> = stored.iter().map(|p| p.symbol.as_str()).collect();
    for symbol in replayed.positions.keys() {
        if !held.contains(&symbol.as_str()) {
            issues.push(format!("{symbol} is missing but the log says it is open"));
        }
    }
    issues
}
