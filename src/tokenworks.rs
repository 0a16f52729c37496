use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::chain::{OwnershipClient, RpcClient};
use crate::db::store::{ListingStore, ListingTable};
use crate::price::wei_to_eth;
use crate::types::{Listing, Source};

/// Resolves the secondary market's custodian-held inventory to priced
/// listings.
///
/// Two-tier price resolution per token: probe the mirror's existing
/// `tokenworks` rows first, fall back to the on-chain `nftForSale` view only
/// on a miss. On-chain call volume stays bounded to newly-appeared or
/// previously-unpriced tokens.
pub struct TokenworksResolver<'a> {
    pub ownership: &'a OwnershipClient,
    pub rpc: &'a RpcClient,
    pub store: &'a ListingStore,
    /// Custodian contract holding the inventory; also the recorded owner.
    pub custodian: &'a str,
    /// The collection's ERC-721 contract.
    pub contract: &'a str,
}

impl TokenworksResolver<'_> {
    /// Enumerate custodian holdings and price each token, cache first.
    /// A zero on-chain price means "not for sale"; zero-priced and failed
    /// tokens are excluded, never fatal.
    pub async fn resolve_owned_listings(&self, table: ListingTable) -> Vec<Listing> {
        let token_ids = self
            .ownership
            .owned_token_ids(self.custodian, self.contract)
            .await;

        let cached: HashMap<String, Decimal> = match self
            .store
            .prices_for_source(table, Source::Tokenworks)
            .await
        {
            Ok(map) => map,
            Err(e) => {
                warn!("price cache read failed, querying the chain for every token: {e}");
                HashMap::new()
            }
        };

        info!(
            "[tokenworks] {} owned tokens, {} cached prices",
            token_ids.len(),
            cached.len()
        );

        let mut listings = Vec::with_capacity(token_ids.len());
        for token_id in token_ids {
            if let Some(price) = cached.get(&token_id) {
                listings.push(Listing::new(
                    token_id,
                    *price,
                    Some(self.custodian.to_string()),
                ));
                continue;
            }

            let price_wei = match self.rpc.nft_for_sale(self.contract, &token_id).await {
                Ok(wei) => wei,
                Err(e) => {
                    warn!("nftForSale({token_id}) failed, skipping: {e}");
                    continue;
                }
            };
            if price_wei.is_zero() {
                debug!("token {token_id} not for sale");
                continue;
            }
            let Some(price) = wei_to_eth(price_wei) else {
                warn!("nftForSale({token_id}) price out of range, skipping");
                continue;
            };

            listings.push(Listing::new(
                token_id,
                price,
                Some(self.custodian.to_string()),
            ));
        }

        listings
    }
}
