use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::db::models::ListingRow;
use crate::db::store::ListingTable;
use crate::error::AppError;
use crate::sync::SyncContext;
use crate::types::Source;

#[derive(Clone)]
pub struct ApiState {
    pub ctx: Arc<SyncContext>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/cron/sync-listings", get(trigger_sync))
        .route("/listings", get(get_listings))
        .route("/editions", get(get_editions))
        .route("/health", get(health))
        .with_state(state)
}

/// The cron trigger: one full sync run per GET, no parameters. Success is a
/// plain 200 confirmation; any failure maps to 500 with the error text via
/// AppError's IntoResponse. Non-overlap of runs is the external scheduler's
/// discipline, not enforced here.
async fn trigger_sync(State(state): State<ApiState>) -> Result<&'static str, AppError> {
    info!("sync run triggered");
    state.ctx.run_all().await?;
    Ok("Sync listings completed successfully")
}

#[derive(Deserialize)]
pub struct ListingsQuery {
    /// Optional partition filter: "opensea" or "tokenworks".
    pub source: Option<String>,
}

async fn get_listings(
    State(state): State<ApiState>,
    Query(params): Query<ListingsQuery>,
) -> Result<Json<Vec<ListingRow>>, AppError> {
    let source = params
        .source
        .as_deref()
        .and_then(|s| s.parse::<Source>().ok());
    let rows = state.ctx.store.listings(ListingTable::Checks, source).await?;
    Ok(Json(rows))
}

async fn get_editions(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ListingRow>>, AppError> {
    let rows = state.ctx.store.listings(ListingTable::Editions, None).await?;
    Ok(Json(rows))
}

async fn health() -> &'static str {
    "ok"
}
