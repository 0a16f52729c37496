use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::warn;

use super::models::ListingRow;
use crate::config::STORE_BATCH_SIZE;
use crate::error::Result;
use crate::types::{Listing, Source};

/// Mirror tables the sync may write. A fixed set; table names are
/// interpolated into SQL and must never come from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingTable {
    Checks,
    Editions,
}

impl ListingTable {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingTable::Checks => "checks_listings",
            ListingTable::Editions => "editions_listings",
        }
    }

    /// Whether this table carries the `source` partition column.
    fn partitioned(self) -> bool {
        matches!(self, ListingTable::Checks)
    }
}

/// Key-value style access to the mirror tables: batched upsert keyed by
/// `token_id`, id enumeration per partition, batched partition-scoped delete.
#[derive(Clone)]
pub struct ListingStore {
    pool: SqlitePool,
}

impl ListingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Upsert listings in fixed-size batches. `token_id` is the sole conflict
    /// key. Only listing-owned columns are written, so metadata columns set
    /// by the enrichment job survive every refresh.
    pub async fn upsert_listings(
        &self,
        table: ListingTable,
        source: Option<Source>,
        listings: &[Listing],
        last_seen_at: &str,
    ) -> Result<()> {
        let with_source = table.partitioned();

        for chunk in listings.chunks(STORE_BATCH_SIZE) {
            let columns = if with_source {
                "(token_id, price, owner, highest_offer, last_seen_at, source)"
            } else {
                "(token_id, price, owner, highest_offer, last_seen_at)"
            };
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("INSERT INTO {} {} ", table.as_str(), columns));

            qb.push_values(chunk, |mut b, listing| {
                b.push_bind(&listing.token_id)
                    .push_bind(listing.price.to_string())
                    .push_bind(listing.owner.as_deref())
                    .push_bind(listing.highest_offer.map(|o| o.to_string()))
                    .push_bind(last_seen_at);
                if with_source {
                    b.push_bind(source.map(Source::as_str));
                }
            });

            qb.push(
                " ON CONFLICT(token_id) DO UPDATE SET \
                 price = excluded.price, \
                 owner = excluded.owner, \
                 highest_offer = excluded.highest_offer, \
                 last_seen_at = excluded.last_seen_at",
            );
            if with_source {
                qb.push(", source = excluded.source");
            }

            qb.build().execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Token ids currently stored, optionally restricted to one partition.
    pub async fn token_ids(
        &self,
        table: ListingTable,
        source: Option<Source>,
    ) -> Result<HashSet<String>> {
        let rows = match source.filter(|_| table.partitioned()) {
            Some(src) => {
                let sql = format!("SELECT token_id FROM {} WHERE source = ?", table.as_str());
                sqlx::query(&sql)
                    .bind(src.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT token_id FROM {}", table.as_str());
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("token_id"))
            .collect())
    }

    /// Delete the given token ids in fixed-size batches, scoped to the
    /// partition that owns them. Rows from another source are never touched.
    pub async fn delete_token_ids(
        &self,
        table: ListingTable,
        source: Option<Source>,
        token_ids: &[String],
    ) -> Result<u64> {
        let mut deleted = 0u64;

        for chunk in token_ids.chunks(STORE_BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("DELETE FROM {} WHERE ", table.as_str()));
            if let Some(src) = source.filter(|_| table.partitioned()) {
                qb.push("source = ");
                qb.push_bind(src.as_str());
                qb.push(" AND ");
            }
            qb.push("token_id IN (");
            let mut separated = qb.separated(", ");
            for token_id in chunk {
                separated.push_bind(token_id);
            }
            qb.push(")");

            deleted += qb.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(deleted)
    }

    /// Token → price map for one partition. The secondary-market resolver's
    /// cache probe: a hit here skips the on-chain call entirely.
    pub async fn prices_for_source(
        &self,
        table: ListingTable,
        source: Source,
    ) -> Result<HashMap<String, Decimal>> {
        let sql = format!(
            "SELECT token_id, price FROM {} WHERE source = ?",
            table.as_str()
        );
        let rows = sqlx::query(&sql)
            .bind(source.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let token_id: String = row.get("token_id");
            let price: String = row.get("price");
            match price.parse::<Decimal>() {
                Ok(parsed) => {
                    map.insert(token_id, parsed);
                }
                Err(e) => warn!("ignoring unparseable cached price for {token_id}: {e}"),
            }
        }
        Ok(map)
    }

    /// Read-side select for the HTTP API.
    pub async fn listings(
        &self,
        table: ListingTable,
        source: Option<Source>,
    ) -> Result<Vec<ListingRow>> {
        let rows = match source.filter(|_| table.partitioned()) {
            Some(src) => {
                let sql = format!(
                    "SELECT * FROM {} WHERE source = ? ORDER BY CAST(token_id AS INTEGER)",
                    table.as_str()
                );
                sqlx::query_as::<_, ListingRow>(&sql)
                    .bind(src.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT * FROM {} ORDER BY CAST(token_id AS INTEGER)",
                    table.as_str()
                );
                sqlx::query_as::<_, ListingRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }
}
