use std::sync::Arc;

use anyhow::Result;
use inventory_ledger::api::routes::{AppState, app_router};
use inventory_ledger::config::Config;
use inventory_ledger::ledger::LedgerService;
use inventory_ledger::persistence::{LedgerStore, MemoryStore, PgStore, create_pool_and_migrate};
use inventory_ledger::telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    match &config.database_url {
        Some(url) => {
            let pool = create_pool_and_migrate(url, config.db_max_connections).await?;
            serve(&config, PgStore::new(pool)).await
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            serve(&config, MemoryStore::new()).await
        }
    }
}

async fn serve<S: LedgerStore>(config: &Config, store: S) -> Result<()> {
    let state = AppState {
        ledger: LedgerService::new(Arc::new(store)).with_max_retries(config.max_tx_retries),
        jwt_secret: config.jwt_secret.clone().into(),
        starting_cash: config.starting_cash,
    };
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
