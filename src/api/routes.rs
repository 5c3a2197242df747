//! HTTP routes for the portfolio dashboard.
//!
//! - GET  /health
//! - GET  /api/assets                  open positions
//! - POST /api/assets                  buy
//! - POST /api/assets/{id}/sell        sell (all or part) of a position
//! - GET  /api/transactions            ledger, newest first
//! - GET  /api/wallet                  cash balance
//! - POST /api/wallet/credit           deposit cash
//! - GET  /api/quotes/{symbol}         current price
//! - GET  /api/portfolio/summary       valuation and allocation
//! - GET  /api/audit                   replay the log against stored positions

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::{AuditReport, Ledger};
use crate::types::position::{Category, Position, PositionId};
use crate::types::request::{BuyRequest, SellRequest, SellStatus};
use crate::types::transaction::{Transaction, TransactionId};
use crate::valuation::PortfolioSummary;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/assets", get(list_assets).post(add_asset))
        .route("/api/assets/{id}/sell", post(sell_asset))
        .route("/api/transactions", get(list_transactions))
        .route("/api/wallet", get(wallet_balance))
        .route("/api/wallet/credit", post(credit_wallet))
        .route("/api/quotes/{symbol}", get(quote))
        .route("/api/portfolio/summary", get(summary))
        .route("/api/audit", get(audit))
        .with_state(state)
}

async fn health() -> &'static str {
    "healthy"
}

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAssetBody {
    #[serde(default)]
    pub asset_name: Option<String>,
    pub asset_symbol: String,
    pub shares: f64,
    pub purchase_price: f64,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD`.
    #[serde(default)]
    pub purchase_date: Option<String>,
    pub category: Category,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAssetResponse {
    pub message: String,
    pub asset_id: PositionId,
    pub transaction_id: TransactionId,
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellAssetBody {
    pub volume_sold: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellAssetResponse {
    pub message: String,
    pub status: SellStatus,
    pub id: PositionId,
    pub transaction_id: TransactionId,
    pub unit_price: f64,
    pub remaining_quantity: f64,
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreditBody {
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub symbol: String,
    pub current_price: f64,
}

pub fn parse_purchase_date(raw: &str) -> Result<DateTime<Utc>, LedgerError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| LedgerError::Invalid(format!("unrecognized purchase date '{raw}'")))
}

/// Malformed bodies get the same `{error, code}` envelope as ledger rejections.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, LedgerError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| LedgerError::Invalid(rejection.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_assets(State(state): State<AppState>) -> Result<Json<Vec<Position>>, LedgerError> {
    Ok(Json(state.ledger.list_positions().await?))
}

async fn add_asset(
    State(state): State<AppState>,
    body: Result<Json<AddAssetBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AddAssetResponse>), LedgerError> {
    let body = json_body(body)?;
    let executed_at = body
        .purchase_date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(parse_purchase_date)
        .transpose()?;
    let receipt = state
        .ledger
        .buy(BuyRequest {
            name: body.asset_name.unwrap_or_default(),
            symbol: body.asset_symbol,
            category: body.category,
            unit_price: body.purchase_price,
            quantity: body.shares,
            executed_at,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AddAssetResponse {
            message: "Asset added successfully".to_string(),
            asset_id: receipt.position_id,
            transaction_id: receipt.transaction_id,
            balance: receipt.balance,
        }),
    ))
}

async fn sell_asset(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<SellAssetBody>, JsonRejection>,
) -> Result<Json<SellAssetResponse>, LedgerError> {
    let Path(id) = id.map_err(|rejection| LedgerError::Invalid(rejection.body_text()))?;
    let body = json_body(body)?;
    let receipt = state
        .ledger
        .sell(SellRequest {
            position_id: id,
            quantity: body.volume_sold,
            unit_price: body.sale_price,
        })
        .await?;
    Ok(Json(SellAssetResponse {
        message: format!("Asset {} successfully", receipt.status.as_str()),
        status: receipt.status,
        id: receipt.position_id,
        transaction_id: receipt.transaction_id,
        unit_price: receipt.unit_price,
        remaining_quantity: receipt.remaining_quantity,
        balance: receipt.balance,
    }))
}

async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, LedgerError> {
    Ok(Json(state.ledger.list_transactions().await?))
}

async fn wallet_balance(State(state): State<AppState>) -> Result<Json<BalanceResponse>, LedgerError> {
    let balance = state.ledger.wallet_balance().await?;
    Ok(Json(BalanceResponse { balance }))
}

async fn credit_wallet(
    State(state): State<AppState>,
    body: Result<Json<CreditBody>, JsonRejection>,
) -> Result<Json<BalanceResponse>, LedgerError> {
    let body = json_body(body)?;
    let balance = state.ledger.credit_wallet(body.amount).await?;
    Ok(Json(BalanceResponse { balance }))
}

async fn quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<QuoteResponse>, LedgerError> {
    let current_price = state.ledger.quote(&symbol).await?;
    Ok(Json(QuoteResponse {
        symbol: symbol.trim().to_uppercase(),
        current_price,
    }))
}

async fn summary(State(state): State<AppState>) -> Result<Json<PortfolioSummary>, LedgerError> {
    Ok(Json(state.ledger.summary().await?))
}

async fn audit(State(state): State<AppState>) -> Result<Json<AuditReport>, LedgerError> {
    Ok(Json(state.ledger.audit().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_date_accepts_plain_dates_and_rfc3339() {
        let d = parse_purchase_date("2024-06-01").unwrap();
        assert_eq!(d.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        let t = parse_purchase_date("2024-06-01T12:30:00+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-06-01T10:30:00+00:00");
        assert!(parse_purchase_date("June 1st").is_err());
    }
}
