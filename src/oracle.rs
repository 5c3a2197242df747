//! Price oracle: the market-data collaborator that supplies a current unit price.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::types::position::normalize_symbol;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no price data for {0}")]
    NotFound(String),

    #[error("price source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<f64, OracleError>;
}

/// Used when no market-data provider is configured; every quote fails.
#[derive(Debug, Clone, Default)]
pub struct NoOracle;

#[async_trait]
impl PriceOracle for NoOracle {
    async fn quote(&self, _symbol: &str) -> Result<f64, OracleError> {
        Err(OracleError::Unavailable("no market data provider configured".to_string()))
    }
}

/// Previous-close quotes from Polygon's aggregates API.
///
/// The API key is appended to the query string; never log the built URL.
#[derive(Debug, Clone)]
pub struct PolygonOracle {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PrevCloseResponse {
    #[serde(default)]
    results: Vec<PrevCloseBar>,
}

#[derive(Debug, Deserialize)]
struct PrevCloseBar {
    /// Close price.
    c: f64,
}

impl PolygonOracle {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn prev_close_url(&self, symbol: &str) -> String {
        format!("{}/v2/aggs/ticker/{}/prev", self.base_url, normalize_symbol(symbol))
    }
}

#[async_trait]
impl PriceOracle for PolygonOracle {
    async fn quote(&self, symbol: &str) -> Result<f64, OracleError> {
        let response = self
            .http
            .get(self.prev_close_url(symbol))
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.without_url().to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(OracleError::NotFound(normalize_symbol(symbol)));
        }
        if !response.status().is_success() {
            return Err(OracleError::Unavailable(format!("upstream status {}", response.status())));
        }

        let body: PrevCloseResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Unavailable(format!("decode: {}", e.without_url())))?;

        let close = body
            .results
            .first()
            .map(|bar| bar.c)
            .ok_or_else(|| OracleError::NotFound(normalize_symbol(symbol)))?;
        if !close.is_finite() || close <= 0.0 {
            return Err(OracleError::Unavailable(format!("unusable price {close}")));
        }
        debug!(symbol, close, "polygon quote");
        Ok(close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prev_close_url_normalizes_symbol_and_trims_base() {
        let oracle = PolygonOracle::new(
            "k".to_string(),
            "https://api.polygon.io/".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            oracle.prev_close_url(" aapl"),
            "https://api.polygon.io/v2/aggs/ticker/AAPL/prev"
        );
    }

    #[test]
    fn prev_close_body_decodes_close() {
        let body: PrevCloseResponse =
            serde_json::from_str(r#"{"ticker":"AAPL","results":[{"c":187.5,"o":185.0}]}"#).unwrap();
        assert_eq!(body.results[0].c, 187.5);
        let empty: PrevCloseResponse = serde_json::from_str(r#"{"resultsCount":0}"#).unwrap();
        assert!(empty.results.is_empty());
    }

    #[tokio::test]
    async fn no_oracle_is_always_unavailable() {
        assert!(matches!(NoOracle.quote("AAPL").await, Err(OracleError::Unavailable(_))));
    }
}
