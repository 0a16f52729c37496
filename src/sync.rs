use tracing::{error, info};

use crate::chain::{OwnershipClient, RpcClient};
use crate::config::Config;
use crate::db::store::{ListingStore, ListingTable};
use crate::enrich::enrich_with_offers;
use crate::error::{AppError, Result};
use crate::fetcher::OpenSeaClient;
use crate::floor::reduce_to_floor;
use crate::reconcile::reconcile;
use crate::tokenworks::TokenworksResolver;
use crate::types::Source;

/// The capability objects one sync run needs: the store plus the three
/// network clients. Constructed once in main, shared with the trigger
/// handler; every piece is substitutable in tests.
#[derive(Clone)]
pub struct SyncContext {
    pub cfg: Config,
    pub store: ListingStore,
    pub opensea: OpenSeaClient,
    pub ownership: OwnershipClient,
    pub rpc: RpcClient,
}

impl SyncContext {
    /// One full run: originals from the primary marketplace, the custodian's
    /// secondary-market inventory into the same table, editions into their
    /// own table. The three syncs are independent (a failure in one is
    /// logged and the others still run) but the trigger reports failure for
    /// the run whenever any of them failed.
    pub async fn run_all(&self) -> Result<()> {
        let mut failures: Vec<String> = Vec::new();

        if let Err(e) = self.sync_opensea_originals().await {
            error!("[originals] sync failed: {e}");
            failures.push(format!("originals: {e}"));
        }
        if let Err(e) = self.sync_tokenworks().await {
            error!("[tokenworks] sync failed: {e}");
            failures.push(format!("tokenworks: {e}"));
        }
        if let Err(e) = self.sync_editions().await {
            error!("[editions] sync failed: {e}");
            failures.push(format!("editions: {e}"));
        }

        if failures.is_empty() {
            info!("all listing syncs completed");
            Ok(())
        } else {
            Err(AppError::Sync(failures.join("; ")))
        }
    }

    pub async fn sync_opensea_originals(&self) -> Result<()> {
        self.sync_marketplace_collection(
            &self.cfg.originals_slug,
            ListingTable::Checks,
            Some(Source::Opensea),
            "originals",
        )
        .await
    }

    pub async fn sync_editions(&self) -> Result<()> {
        self.sync_marketplace_collection(
            &self.cfg.editions_slug,
            ListingTable::Editions,
            None,
            "editions",
        )
        .await
    }

    /// fetch → floor-reduce → offers (batch map, then per-token fallback) →
    /// reconcile.
    async fn sync_marketplace_collection(
        &self,
        slug: &str,
        table: ListingTable,
        source: Option<Source>,
        tag: &str,
    ) -> Result<()> {
        let raw = self.opensea.fetch_all_listings(slug).await;
        let mut listings = reduce_to_floor(raw);
        info!("[{tag}] {} floor listings", listings.len());

        // One paginated read covers most tokens; anything missing falls back
        // to the per-token endpoint below. Offers stay best-effort throughout.
        let offer_map = self.opensea.fetch_collection_best_offers(slug).await;
        let mut seeded = 0;
        for listing in listings.iter_mut() {
            if let Some(offer) = offer_map.get(&listing.token_id) {
                listing.highest_offer = Some(*offer);
                seeded += 1;
            }
        }
        let fetched = enrich_with_offers(
            &self.opensea,
            slug,
            &mut listings,
            self.cfg.offer_concurrency,
        )
        .await;
        info!("[{tag}] highest offers set: {seeded} from batch, {fetched} per-token");

        reconcile(&self.store, table, source, &listings).await
    }

    /// resolve (cache-first) → reconcile. The secondary market takes no
    /// standing offers, so highest_offer is forced empty on every row.
    pub async fn sync_tokenworks(&self) -> Result<()> {
        let resolver = TokenworksResolver {
            ownership: &self.ownership,
            rpc: &self.rpc,
            store: &self.store,
            custodian: &self.cfg.tokenworks_address,
            contract: &self.cfg.originals_contract,
        };
        let listings = resolver.resolve_owned_listings(ListingTable::Checks).await;
        info!("[tokenworks] {} listings (offers skipped)", listings.len());

        reconcile(
            &self.store,
            ListingTable::Checks,
            Some(Source::Tokenworks),
            &listings,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::test_support::memory_store;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_entry(token_id: &str, price_wei: &str, owner: &str) -> serde_json::Value {
        json!({
            "protocol_data": {
                "parameters": {
                    "offer": [{ "identifierOrCriteria": token_id }],
                    "offerer": owner,
                }
            },
            "price": { "current": { "value": price_wei } }
        })
    }

    fn test_config(opensea: &MockServer, chain: &MockServer) -> Config {
        Config {
            opensea_api_key: "test-key".to_string(),
            opensea_base_url: opensea.uri(),
            alchemy_base_url: chain.uri(),
            alchemy_rpc_url: chain.uri(),
            tokenworks_address: "0x000000000000000000000000000000000000c0de".to_string(),
            originals_contract: "0x0000000000000000000000000000000000001337".to_string(),
            originals_slug: "vv-checks-originals".to_string(),
            editions_slug: "vv-checks".to_string(),
            log_level: "info".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            offer_concurrency: 5,
        }
    }

    async fn context(opensea: &MockServer, chain: &MockServer) -> SyncContext {
        let cfg = test_config(opensea, chain);
        SyncContext {
            store: memory_store().await,
            opensea: OpenSeaClient::new(cfg.opensea_base_url.clone(), cfg.opensea_api_key.clone())
                .unwrap(),
            ownership: OwnershipClient::new(cfg.alchemy_base_url.clone()).unwrap(),
            rpc: RpcClient::new(cfg.alchemy_rpc_url.clone()).unwrap(),
            cfg,
        }
    }

    /// Two listing pages (with a duplicate token), offers unavailable: the
    /// mirror ends up with floor-reduced rows.
    #[tokio::test]
    async fn originals_sync_floor_reduces_across_pages() {
        let opensea = MockServer::start().await;
        let chain = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/listings/collection/vv-checks-originals/best"))
            .and(query_param_is_missing("next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "listings": [
                    listing_entry("1", "2000000000000000000", "0xaa"),
                    listing_entry("1", "1500000000000000000", "0xbb"),
                ],
                "next": "page2",
            })))
            .mount(&opensea)
            .await;
        Mock::given(method("GET"))
            .and(path("/listings/collection/vv-checks-originals/best"))
            .and(query_param("next", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "listings": [listing_entry("2", "500000000000000000", "0xcc")],
            })))
            .mount(&opensea)
            .await;

        // Offer endpoints down; enrichment is best-effort.
        Mock::given(method("GET"))
            .and(path("/offers/collection/vv-checks-originals/all"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&opensea)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&opensea)
            .await;

        let ctx = context(&opensea, &chain).await;
        ctx.sync_opensea_originals().await.unwrap();

        let rows = ctx
            .store
            .listings(ListingTable::Checks, Some(Source::Opensea))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].token_id, "1");
        assert_eq!(rows[0].price, "1.5");
        assert_eq!(rows[0].owner.as_deref(), Some("0xbb"));
        assert_eq!(rows[1].token_id, "2");
        assert_eq!(rows[1].price, "0.5");
    }

    /// Batch offers seed the map; the per-token pool fills the rest.
    #[tokio::test]
    async fn originals_sync_combines_batch_and_per_token_offers() {
        let opensea = MockServer::start().await;
        let chain = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/listings/collection/vv-checks-originals/best"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "listings": [
                    listing_entry("1", "1000000000000000000", "0xaa"),
                    listing_entry("2", "2000000000000000000", "0xbb"),
                ],
            })))
            .mount(&opensea)
            .await;

        Mock::given(method("GET"))
            .and(path("/offers/collection/vv-checks-originals/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "offers": [{
                    "protocol_data": {
                        "parameters": {
                            "consideration": [{ "identifierOrCriteria": "1" }],
                        }
                    },
                    "price": { "value": "900000000000000000" }
                }],
            })))
            .mount(&opensea)
            .await;

        Mock::given(method("GET"))
            .and(path("/offers/collection/vv-checks-originals/nfts/2/best"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "offer": { "price": { "value": "1800000000000000000" } }
            })))
            .mount(&opensea)
            .await;

        let ctx = context(&opensea, &chain).await;
        ctx.sync_opensea_originals().await.unwrap();

        let rows = ctx
            .store
            .listings(ListingTable::Checks, Some(Source::Opensea))
            .await
            .unwrap();
        assert_eq!(rows[0].highest_offer.as_deref(), Some("0.9"));
        assert_eq!(rows[1].highest_offer.as_deref(), Some("1.8"));
    }

    /// The tokenworks pass forces offers empty and reconciles into its own
    /// partition of the shared table.
    #[tokio::test]
    async fn tokenworks_sync_writes_offerless_rows() {
        let opensea = MockServer::start().await;
        let chain = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/getNFTs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ownedNfts": [{ "id": { "tokenId": "0x05" } }],
            })))
            .mount(&chain)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x29a2241af62c0000", // 3 ETH
            })))
            .mount(&chain)
            .await;

        let ctx = context(&opensea, &chain).await;
        ctx.sync_tokenworks().await.unwrap();

        let rows = ctx
            .store
            .listings(ListingTable::Checks, Some(Source::Tokenworks))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token_id, "5");
        assert_eq!(rows[0].price, "3");
        assert_eq!(rows[0].highest_offer, None);
        assert_eq!(rows[0].owner.as_deref(), Some(ctx.cfg.tokenworks_address.as_str()));
    }

    /// Marketplace fetch failures truncate soft; the tokenworks pass still
    /// syncs and the run succeeds.
    #[tokio::test]
    async fn fetch_failures_do_not_abort_the_run() {
        let opensea = MockServer::start().await;
        let chain = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/getNFTs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ownedNfts": [{ "id": { "tokenId": "0x01" } }],
            })))
            .mount(&chain)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x0de0b6b3a7640000",
            })))
            .mount(&chain)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&opensea)
            .await;

        let ctx = context(&opensea, &chain).await;
        ctx.run_all().await.unwrap();

        // Marketplace collections truncated to empty (not an error) while
        // the tokenworks partition got its row.
        let rows = ctx
            .store
            .listings(ListingTable::Checks, Some(Source::Tokenworks))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token_id, "1");
    }

    /// Store failures abort each collection's sync, every collection is still
    /// attempted, and the run reports the combined failure.
    #[tokio::test]
    async fn store_failure_fails_the_run_after_trying_every_collection() {
        let opensea = MockServer::start().await;
        let chain = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&opensea)
            .await;
        Mock::given(method("GET"))
            .and(path("/getNFTs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ownedNfts": [] })))
            .mount(&chain)
            .await;

        let ctx = context(&opensea, &chain).await;
        ctx.store.pool().close().await;

        let err = ctx.run_all().await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("originals:"), "missing originals failure: {msg}");
        assert!(msg.contains("tokenworks:"), "missing tokenworks failure: {msg}");
        assert!(msg.contains("editions:"), "missing editions failure: {msg}");
    }
}
