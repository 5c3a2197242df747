//! Ledger facade: buy, sell, list_positions, list_transactions, wallet_balance,
//! credit_wallet, plus quote/summary/audit reporting.
//!
//! A buy or sell runs as one store transaction: wallet, position and log entry are all
//! committed together or not at all. Any `?` before `commit` drops the transaction, which
//! rolls it back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alerts::LowBalanceAlert;
use crate::error::LedgerError;
use crate::oracle::{OracleError, PriceOracle};
use crate::persistence::LedgerStore;
use crate::positions::{self, BuyEffect, SellEffect};
use crate::recorder;
use crate::types::position::{Position, normalize_symbol};
use crate::types::request::{
    BuyReceipt, BuyRequest, SellReceipt, SellRequest, SellStatus, ensure_positive,
};
use crate::types::transaction::{Transaction, TransactionKind, sort_for_display};
use crate::valuation::{self, PortfolioSummary};
use crate::wallet;

pub const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tolerance used when comparing stored positions with the replayed log.
const AUDIT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub consistent: bool,
    pub transactions: usize,
    pub open_positions: usize,
    pub issues: Vec<String>,
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    oracle: Arc<dyn PriceOracle>,
    quote_timeout: Duration,
    low_balance: Option<LowBalanceAlert>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            store,
            oracle,
            quote_timeout: DEFAULT_QUOTE_TIMEOUT,
            low_balance: None,
        }
    }

    pub fn with_quote_timeout(mut self, timeout: Duration) -> Self {
        self.quote_timeout = timeout;
        self
    }

    pub fn with_low_balance_alert(mut self, alert: LowBalanceAlert) -> Self {
        self.low_balance = Some(alert);
        self
    }

    /// Buy: reserve funds, open or merge the position, record the fill, commit.
    pub async fn buy(&self, request: BuyRequest) -> Result<BuyReceipt, LedgerError> {
        let order = request.validate()?;
        let cost = order.cost();

        let mut tx = self.store.begin().await?;
        let balance = match wallet::reserve(tx.as_mut(), cost).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(symbol = %order.symbol, cost, error = %e, "buy rejected");
                return Err(e);
            }
        };
        let effect = positions::reconcile_buy(tx.as_mut(), &order).await?;
        let entry = recorder::record(
            tx.as_mut(),
            effect.position(),
            TransactionKind::Buy,
            order.unit_price,
            order.quantity,
            order.executed_at,
        )
        .await?;
        tx.commit().await?;

        let position = effect.position();
        info!(
            symbol = %position.symbol,
            quantity = order.quantity,
            unit_price = order.unit_price,
            held = position.quantity,
            avg_price = position.avg_price,
            opened = matches!(effect, BuyEffect::Opened(_)),
            balance,
            "buy committed"
        );

        if let Some(alert) = &self.low_balance {
            alert.check(balance);
        }

        Ok(BuyReceipt {
            position_id: position.id,
            transaction_id: entry.id,
            balance,
        })
    }

    /// Sell: settle at the caller's price or the oracle's, credit proceeds, shrink or
    /// close the position, record the fill, commit.
    pub async fn sell(&self, request: SellRequest) -> Result<SellReceipt, LedgerError> {
        request.validate()?;

        // Reject unknown positions and obvious oversells before asking the oracle.
        // Both checks are repeated under lock below.
        let snapshot = self
            .store
            .get_position(request.position_id)
            .await?
            .ok_or(LedgerError::NotFound(request.position_id))?;
        positions::reduce_sell(&snapshot, request.quantity)?;

        let unit_price = match request.unit_price {
            Some(price) => price,
            None => self.settlement_quote(&snapshot.symbol).await?,
        };
        let proceeds = unit_price * request.quantity;
        if !proceeds.is_finite() {
            return Err(LedgerError::Invalid(
                "sale proceeds are not a finite number".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        // Lock order matches buy: wallet first, then position.
        let balance = wallet::credit(tx.as_mut(), proceeds).await?;
        let position = tx
            .position_by_id(request.position_id)
            .await?
            .ok_or(LedgerError::NotFound(request.position_id))?;
        let effect = positions::reconcile_sell(tx.as_mut(), &position, request.quantity).await?;
        let entry = recorder::record(
            tx.as_mut(),
            &position,
            TransactionKind::Sell,
            unit_price,
            request.quantity,
            Utc::now(),
        )
        .await?;
        tx.commit().await?;

        let status = match effect {
            SellEffect::Closed(_) => SellStatus::Deleted,
            SellEffect::Reduced(_) => SellStatus::Updated,
        };
        info!(
            symbol = %position.symbol,
            quantity = request.quantity,
            unit_price,
            status = status.as_str(),
            balance,
            "sell committed"
        );

        Ok(SellReceipt {
            status,
            position_id: position.id,
            transaction_id: entry.id,
            unit_price,
            remaining_quantity: effect.remaining_quantity(),
            balance,
        })
    }

    pub async fn list_positions(&self) -> Result<Vec<Position>, LedgerError> {
        Ok(self.store.list_positions().await?)
    }

    /// Newest first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        let mut transactions = self.store.list_transactions().await?;
        sort_for_display(&mut transactions);
        Ok(transactions)
    }

    pub async fn wallet_balance(&self) -> Result<f64, LedgerError> {
        Ok(self.store.wallet_balance().await?)
    }

    /// Deposit cash. Returns the new balance.
    pub async fn credit_wallet(&self, amount: f64) -> Result<f64, LedgerError> {
        ensure_positive("amount", amount)?;
        let mut tx = self.store.begin().await?;
        let balance = wallet::credit(tx.as_mut(), amount).await?;
        tx.commit().await?;
        info!(amount, balance, "wallet credited");
        Ok(balance)
    }

    /// Current price for a symbol, bounded by the quote timeout.
    pub async fn quote(&self, symbol: &str) -> Result<f64, LedgerError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(LedgerError::Invalid("symbol is required".to_string()));
        }
        self.settlement_quote(&symbol).await
    }

    async fn settlement_quote(&self, symbol: &str) -> Result<f64, LedgerError> {
        let unavailable = |reason: String| LedgerError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason,
        };
        let price = match tokio::time::timeout(self.quote_timeout, self.oracle.quote(symbol)).await {
            Ok(Ok(price)) => price,
            Ok(Err(OracleError::NotFound(_))) => return Err(unavailable("no data for symbol".to_string())),
            Ok(Err(e)) => return Err(unavailable(e.to_string())),
            Err(_) => {
                return Err(unavailable(format!(
                    "quote timed out after {}ms",
                    self.quote_timeout.as_millis()
                )));
            }
        };
        if !price.is_finite() || price <= 0.0 {
            return Err(unavailable(format!("oracle returned unusable price {price}")));
        }
        debug!(symbol, price, "quote");
        Ok(price)
    }

    /// Value every open position at its live quote. Quotes run concurrently; a failed
    /// quote leaves that position unpriced.
    pub async fn summary(&self) -> Result<PortfolioSummary, LedgerError> {
        let cash = self.store.wallet_balance().await?;
        let held = self.store.list_positions().await?;
        let quotes = join_all(held.iter().map(|p| self.settlement_quote(&p.symbol))).await;
        let valued = held
            .into_iter()
            .zip(quotes)
            .map(|(position, quote)| valuation::value_position(position, quote.map_err(|e| e.to_string())))
            .collect();
        Ok(valuation::summarize(cash, valued))
    }

    /// Replay the log in creation order and compare the result with stored positions.
    pub async fn audit(&self) -> Result<AuditReport, LedgerError> {
        let log = self.store.list_transactions().await?;
        let stored = self.store.list_positions().await?;
        let replayed = positions::replay(&log);
        let mut issues = replayed.anomalies.clone();
        issues.extend(positions::drift(&stored, &replayed, AUDIT_TOLERANCE));
        if !issues.is_empty() {
            warn!(issues = issues.len(), "ledger audit found drift");
        }
        Ok(AuditReport {
            consistent: issues.is_empty(),
            transactions: log.len(),
            open_positions: stored.len(),
            issues,
        })
    }
}
