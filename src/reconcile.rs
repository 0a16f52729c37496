use std::collections::HashSet;

use chrono::Utc;
use tracing::info;

use crate::db::store::{ListingStore, ListingTable};
use crate::error::Result;
use crate::types::{Listing, Source};

/// Converge one (table, partition) slice of the mirror onto `fresh`: stamp
/// and upsert everything fresh, then delete the rows the partition held that
/// the fresh set no longer contains.
///
/// The upsert completes before the stale-set read, so the diff never runs
/// against a half-updated partition. A failed upsert batch propagates without
/// rolling back earlier batches; the next pass converges the remainder.
pub async fn reconcile(
    store: &ListingStore,
    table: ListingTable,
    source: Option<Source>,
    fresh: &[Listing],
) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    store.upsert_listings(table, source, fresh, &now).await?;

    let fresh_ids: HashSet<String> = fresh.iter().map(|l| l.token_id.clone()).collect();
    let stored_ids = store.token_ids(table, source).await?;
    let stale: Vec<String> = stored_ids.difference(&fresh_ids).cloned().collect();

    let deleted = if stale.is_empty() {
        0
    } else {
        store.delete_token_ids(table, source, &stale).await?
    };

    info!(
        table = table.as_str(),
        source = source.map(Source::as_str).unwrap_or("-"),
        upserted = fresh.len(),
        deleted,
        "reconcile complete"
    );
    Ok(())
}
