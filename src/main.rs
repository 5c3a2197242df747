use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use portfolio_ledger::alerts::{Alerter, LogAlerter, LowBalanceAlert, WebhookAlerter};
use portfolio_ledger::api::routes::{AppState, app_router};
use portfolio_ledger::config::Config;
use portfolio_ledger::oracle::{NoOracle, PolygonOracle, PriceOracle};
use portfolio_ledger::persistence::{LedgerStore, MemoryStore, PgLedgerStore, create_pool_and_migrate};
use portfolio_ledger::Ledger;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let store: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool_and_migrate(url, config.db_max_connections)
                .await
                .context("connecting to DATABASE_URL")?;
            info!("using PostgreSQL ledger store");
            Arc::new(PgLedgerStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; ledger is kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    store
        .seed_wallet(config.initial_wallet_balance)
        .await
        .context("seeding wallet")?;

    let oracle: Arc<dyn PriceOracle> = match &config.polygon_api_key {
        Some(key) => Arc::new(
            PolygonOracle::new(key.clone(), config.polygon_base_url.clone(), config.oracle_timeout)
                .context("building market data client")?,
        ),
        None => {
            warn!("POLYGON_API_KEY not set; sells must carry an explicit sale price");
            Arc::new(NoOracle)
        }
    };

    let mut ledger = Ledger::new(store, oracle).with_quote_timeout(config.oracle_timeout);
    if let Some(threshold) = config.low_balance_threshold {
        let alerter: Arc<dyn Alerter> = match &config.alert_webhook_url {
            Some(url) => Arc::new(
                WebhookAlerter::new(url.clone(), Duration::from_secs(10))
                    .context("building alert webhook client")?,
            ),
            None => Arc::new(LogAlerter),
        };
        ledger = ledger.with_low_balance_alert(LowBalanceAlert::new(threshold, alerter));
    }

    let app = app_router(AppState {
        ledger: Arc::new(ledger),
    })
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("portfolio ledger listening on http://{}", addr);
    axum::serve(listener, app).await.context("server crashed")?;
    Ok(())
}
