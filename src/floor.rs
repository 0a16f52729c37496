use std::collections::HashMap;

use crate::types::Listing;

/// Collapse raw listings to at most one per token: the lowest-priced listing
/// survives. Comparison is exact decimal, strictly less-than, so ties keep
/// the first listing encountered. Output order follows first appearance.
pub fn reduce_to_floor(listings: Vec<Listing>) -> Vec<Listing> {
    let mut floors: HashMap<String, Listing> = HashMap::with_capacity(listings.len());
    let mut order: Vec<String> = Vec::new();

    for listing in listings {
        match floors.get(&listing.token_id) {
            None => {
                order.push(listing.token_id.clone());
                floors.insert(listing.token_id.clone(), listing);
            }
            Some(existing) => {
                if listing.price < existing.price {
                    floors.insert(listing.token_id.clone(), listing);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|token_id| floors.remove(&token_id))
        .collect()
}
