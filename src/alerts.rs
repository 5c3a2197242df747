//! Low-balance alerting. Best effort: a failed notification is logged and dropped and
//! never affects the buy that triggered it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

#[async_trait]
pub trait Alerter: Send + Sync {
    async fn notify_low_balance(&self, balance: f64, threshold: f64) -> anyhow::Result<()>;
}

/// Writes the alert to the log.
#[derive(Debug, Clone, Default)]
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
    async fn notify_low_balance(&self, balance: f64, threshold: f64) -> anyhow::Result<()> {
        warn!(balance, threshold, "wallet balance below alert threshold");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LowBalancePayload {
    event: &'static str,
    balance: f64,
    threshold: f64,
}

/// POSTs a JSON alert to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlerter {
    url: String,
    http: reqwest::Client,
}

impl WebhookAlerter {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http })
    }
}

#[async_trait]
impl Alerter for WebhookAlerter {
    async fn notify_low_balance(&self, balance: f64, threshold: f64) -> anyhow::Result<()> {
        let payload = LowBalancePayload {
            event: "low_balance",
            balance,
            threshold,
        };
        self.http
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Threshold plus the collaborator to tell when the wallet drops under it.
#[derive(Clone)]
pub struct LowBalanceAlert {
    pub threshold: f64,
    pub alerter: Arc<dyn Alerter>,
}

impl LowBalanceAlert {
    pub fn new(threshold: f64, alerter: Arc<dyn Alerter>) -> Self {
        Self { threshold, alerter }
    }

    /// Fire and forget. Must be called only after the buy has committed.
    pub fn check(&self, balance: f64) {
        if balance >= self.threshold {
            return;
        }
        let alerter = self.alerter.clone();
        let threshold = self.threshold;
        tokio::spawn(async move {
            if let Err(e) = alerter.notify_low_balance(balance, threshold).await {
                warn!(error = %e, balance, threshold, "low balance notification failed");
            }
        });
    }
}
