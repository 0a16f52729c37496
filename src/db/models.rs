use serde::Serialize;

/// One mirrored listing row as stored. Prices are exact decimal strings.
///
/// The metadata columns (`image_url` and the trait columns) belong to the
/// metadata enrichment job: reads expose them, the listings sync never
/// writes them. `source` is absent on the editions table, hence the default.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct ListingRow {
    pub token_id: String,
    pub price: String,
    pub owner: Option<String>,
    pub highest_offer: Option<String>,
    pub last_seen_at: String,
    #[sqlx(default)]
    pub source: Option<String>,

    pub image_url: Option<String>,
    pub checks: Option<i64>,
    pub color_band: Option<String>,
    pub day: Option<i64>,
    pub gradient: Option<String>,
    pub shift: Option<String>,
    pub speed: Option<String>,
}
