use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// PostgreSQL URL. Without it the ledger lives in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Balance the wallet row is created with on first boot. Ignored once the row exists.
    pub initial_wallet_balance: f64,
    /// Polygon API key for live quotes.
    pub polygon_api_key: Option<String>,
    pub polygon_base_url: String,
    /// Upper bound on a single quote; a slower quote aborts the sell.
    pub oracle_timeout: Duration,
    /// Alert when a buy leaves less cash than this.
    pub low_balance_threshold: Option<f64>,
    /// Where low-balance alerts are POSTed. Logged only when unset.
    pub alert_webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            db_max_connections: 5,
            initial_wallet_balance: 0.0,
            polygon_api_key: None,
            polygon_base_url: "https://api.polygon.io".to_string(),
            oracle_timeout: Duration::from_millis(5000),
            low_balance_threshold: None,
            alert_webhook_url: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    non_empty(key).and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            database_url: non_empty("DATABASE_URL"),
            db_max_connections: parsed("DB_MAX_CONNECTIONS").unwrap_or(defaults.db_max_connections),
            initial_wallet_balance: parsed::<f64>("INITIAL_WALLET_BALANCE")
                .filter(|b| b.is_finite() && *b >= 0.0)
                .unwrap_or(defaults.initial_wallet_balance),
            polygon_api_key: non_empty("POLYGON_API_KEY"),
            polygon_base_url: non_empty("POLYGON_BASE_URL").unwrap_or(defaults.polygon_base_url),
            oracle_timeout: parsed::<u64>("ORACLE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.oracle_timeout),
            low_balance_threshold: parsed::<f64>("LOW_BALANCE_THRESHOLD").filter(|t| t.is_finite()),
            alert_webhook_url: non_empty("ALERT_WEBHOOK_URL"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
