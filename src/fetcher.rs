use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Config, PAGE_FETCH_TIMEOUT_SECS, SINGLE_FETCH_TIMEOUT_SECS};
use crate::error::Result;
use crate::price::wei_value_to_eth;
use crate::types::Listing;

/// OpenSea v2 REST client. Constructed once and injected wherever listing or
/// offer reads happen; cheap to clone (reqwest::Client is reference-counted).
#[derive(Clone)]
pub struct OpenSeaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenSeaClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PAGE_FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.opensea_base_url.clone(), cfg.opensea_api_key.clone())
    }

    /// Fetch every listing for a collection, following the `next` cursor
    /// until the marketplace stops returning one. 404 means the collection is
    /// unknown or unlisted: an empty sequence, not an error. Any other
    /// failure truncates the fetch: whatever accumulated so far is still
    /// valid input for the rest of the pass.
    pub async fn fetch_all_listings(&self, slug: &str) -> Vec<Listing> {
        let url = format!("{}/listings/collection/{}/best", self.base_url, slug);

        let mut listings: Vec<Listing> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut req = self.authed_get(&url);
            if let Some(ref next) = cursor {
                req = req.query(&[("next", next.as_str())]);
            }

            let page = match self.get_json(req).await {
                Ok(Some(page)) => page,
                Ok(None) => return Vec::new(),
                Err(e) => {
                    warn!(
                        "[{slug}] listings fetch truncated after {} entries: {e}",
                        listings.len()
                    );
                    break;
                }
            };

            if let Some(items) = page.get("listings").and_then(Value::as_array) {
                listings.extend(items.iter().filter_map(parse_listing_entry));
            }

            cursor = page
                .get("next")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        listings
    }

    /// Best current offer for one token, in display units. Absence (404) and
    /// fetch failure both map to None; offer enrichment is best-effort.
    pub async fn fetch_best_offer(&self, slug: &str, token_id: &str) -> Option<Decimal> {
        let url = format!(
            "{}/offers/collection/{}/nfts/{}/best",
            self.base_url, slug, token_id
        );
        let req = self
            .authed_get(&url)
            .timeout(Duration::from_secs(SINGLE_FETCH_TIMEOUT_SECS));

        let data = match self.get_json(req).await {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                debug!("best-offer fetch failed for token {token_id}: {e}");
                return None;
            }
        };

        // Newer responses nest the order under `offer`; older ones are flat.
        let obj = data.get("offer").unwrap_or(&data);
        wei_value_to_eth(obj.get("price")?.get("value")?)
    }

    /// Batch variant: page through the collection-wide best-offers endpoint
    /// and keep, per token, the maximum price observed across pages. A token
    /// can appear more than once and the highest standing offer wins.
    pub async fn fetch_collection_best_offers(&self, slug: &str) -> HashMap<String, Decimal> {
        let url = format!("{}/offers/collection/{}/all", self.base_url, slug);

        let mut best: HashMap<String, Decimal> = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut req = self.authed_get(&url);
            if let Some(ref next) = cursor {
                req = req.query(&[("next", next.as_str())]);
            }

            let page = match self.get_json(req).await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    warn!("[{slug}] collection offers fetch truncated: {e}");
                    break;
                }
            };

            if let Some(items) = page.get("offers").and_then(Value::as_array) {
                for item in items {
                    let Some((token_id, price)) = parse_offer_entry(item) else {
                        continue;
                    };
                    best.entry(token_id)
                        .and_modify(|current| {
                            if price > *current {
                                *current = price;
                            }
                        })
                        .or_insert(price);
                }
            }

            cursor = page
                .get("next")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        best
    }

    fn authed_get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("accept", "*/*")
            .header("x-api-key", &self.api_key)
    }

    /// Ok(None) = 404. Every other non-2xx status or transport error is an Err.
    async fn get_json(&self, req: reqwest::RequestBuilder) -> Result<Option<Value>> {
        let res = req.send().await?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = res.error_for_status()?;
        Ok(Some(res.json::<Value>().await?))
    }
}

/// Pull (token_id, price, owner) out of one raw listing entry. Entries
/// missing identity or price are malformed upstream data, dropped silently.
fn parse_listing_entry(item: &Value) -> Option<Listing> {
    let params = item.get("protocol_data")?.get("parameters")?;
    let token_id = normalized_token_id(
        params
            .get("offer")?
            .as_array()?
            .first()?
            .get("identifierOrCriteria")?,
    )?;
    let price = wei_value_to_eth(item.get("price")?.get("current")?.get("value")?)?;
    let owner = params
        .get("offerer")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Listing::new(token_id, price, owner))
}

/// Offer entries name the token in the first consideration item.
fn parse_offer_entry(item: &Value) -> Option<(String, Decimal)> {
    let token_id = normalized_token_id(
        item.get("protocol_data")?
            .get("parameters")?
            .get("consideration")?
            .as_array()?
            .first()?
            .get("identifierOrCriteria")?,
    )?;
    let price = wei_value_to_eth(item.get("price")?.get("value")?)?;
    Some((token_id, price))
}

fn normalized_token_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
