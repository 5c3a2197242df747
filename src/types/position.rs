use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PositionId = Uuid;

/// Below this many units a position is treated as fully liquidated.
pub const POSITION_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "stock")]
    Stocks,
    #[serde(alias = "bond")]
    Bonds,
    #[serde(alias = "commodity")]
    Commodities,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Stocks, Category::Bonds, Category::Commodities];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stocks => "stocks",
            Category::Bonds => "bonds",
            Category::Commodities => "commodities",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stocks" | "stock" => Some(Category::Stocks),
            "bonds" | "bond" => Some(Category::Bonds),
            "commodities" | "commodity" => Some(Category::Commodities),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One open holding per symbol. `avg_price` is the weighted-average cost per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: PositionId,
    pub symbol: String,
    pub display_name: String,
    pub category: Category,
    pub quantity: f64,
    pub avg_price: f64,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Total cost of the units still held.
    pub fn cost_basis(&self) -> f64 {
        self.avg_price * self.quantity
    }
}

/// Trim and upper-case a ticker so lookups are case-insensitive.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_singular_and_case() {
        assert_eq!(Category::parse("Stocks"), Some(Category::Stocks));
        assert_eq!(Category::parse(" bond "), Some(Category::Bonds));
        assert_eq!(Category::parse("COMMODITY"), Some(Category::Commodities));
        assert_eq!(Category::parse("crypto"), None);
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Commodities).unwrap();
        assert_eq!(json, "\"commodities\"");
    }

    #[test]
    fn normalize_symbol_trims_and_uppercases() {
        assert_eq!(normalize_symbol("  aapl "), "AAPL");
    }
}
