//! Portfolio valuation for reporting: market value, unrealized gain/loss and allocation.
//! A position without a live quote stays unpriced; its cost basis is not used as a price.

use serde::Serialize;

use crate::positions::unrealized_pnl;
use crate::types::position::{Category, Position};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    #[serde(flatten)]
    pub position: Position,
    pub cost_basis: f64,
    pub market_price: Option<f64>,
    pub market_value: Option<f64>,
    pub unrealized_pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAllocation {
    pub category: Category,
    pub cost_basis: f64,
    /// Share of total cost basis, 0..=1.
    pub cost_weight: f64,
    /// Sum over priced positions only.
    pub market_value: f64,
    /// Share of total priced market value, 0..=1.
    pub market_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub cash: f64,
    pub cost_basis: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    /// Symbols left out of `market_value` because no quote was available.
    pub unpriced: Vec<String>,
    pub positions: Vec<PositionValuation>,
    pub allocation: Vec<CategoryAllocation>,
}

pub fn value_position(position: Position, quote: Result<f64, String>) -> PositionValuation {
    let cost_basis = position.cost_basis();
    match quote {
        Ok(price) => PositionValuation {
            cost_basis,
            market_price: Some(price),
            market_value: Some(price * position.quantity),
            unrealized_pnl: Some(unrealized_pnl(&position, price)),
            price_error: None,
            position,
        },
        Err(reason) => PositionValuation {
            cost_basis,
            market_price: None,
            market_value: None,
            unrealized_pnl: None,
            price_error: Some(reason),
            position,
        },
    }
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total } else { 0.0 }
}

pub fn summarize(cash: f64, positions: Vec<PositionValuation>) -> PortfolioSummary {
    let cost_basis: f64 = positions.iter().map(|v| v.cost_basis).sum();
    let market_value: f64 = positions.iter().filter_map(|v| v.market_value).sum();
    let unrealized: f64 = positions.iter().filter_map(|v| v.unrealized_pnl).sum();
    let unpriced = positions
        .iter()
        .filter(|v| v.market_price.is_none())
        .map(|v| v.position.symbol.clone())
        .collect();

    let allocation = Category::ALL
        .iter()
        .filter_map(|&category| {
            let members: Vec<&PositionValuation> =
                positions.iter().filter(|v| v.position.category == category).collect();
            if members.is_empty() {
                return None;
            }
            let cat_cost: f64 = members.iter().map(|v| v.cost_basis).sum();
            let cat_market: f64 = members.iter().filter_map(|v| v.market_value).sum();
            Some(CategoryAllocation {
                category,
                cost_basis: cat_cost,
                cost_weight: share(cat_cost, cost_basis),
                market_value: cat_market,
                market_weight: share(cat_market, market_value),
            })
        })
        .collect();

    PortfolioSummary {
        cash,
        cost_basis,
        market_value,
        unrealized_pnl: unrealized,
        unpriced,
        positions,
        allocation,
    }
}
