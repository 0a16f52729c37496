mod api;
mod chain;
mod config;
mod db;
mod enrich;
mod error;
mod fetcher;
mod floor;
mod price;
mod reconcile;
mod sync;
mod tokenworks;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::chain::{OwnershipClient, RpcClient};
use crate::config::Config;
use crate::db::store::ListingStore;
use crate::error::Result;
use crate::fetcher::OpenSeaClient;
use crate::sync::SyncContext;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    let ctx = SyncContext {
        store: ListingStore::new(pool),
        opensea: OpenSeaClient::from_config(&cfg)?,
        ownership: OwnershipClient::from_config(&cfg)?,
        rpc: RpcClient::from_config(&cfg)?,
        cfg,
    };

    let bind_addr = format!("0.0.0.0:{}", ctx.cfg.api_port);
    let app = router(ApiState { ctx: Arc::new(ctx) });
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}; GET /cron/sync-listings runs a sync");

    axum::serve(listener, app).await?;

    Ok(())
}
