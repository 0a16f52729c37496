use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::fetcher::OpenSeaClient;
use crate::types::Listing;

/// Fan out one best-offer request per un-enriched listing across a bounded
/// worker pool and merge the results back by token identity. Every dispatched
/// task runs to completion; a failed or absent offer leaves that listing's
/// `highest_offer` unset and never disturbs sibling tasks. Returns how many
/// offers were set.
pub async fn enrich_with_offers(
    client: &OpenSeaClient,
    slug: &str,
    listings: &mut [Listing],
    concurrency: usize,
) -> usize {
    let targets: Vec<String> = listings
        .iter()
        .filter(|l| l.highest_offer.is_none())
        .map(|l| l.token_id.clone())
        .collect();
    if targets.is_empty() {
        return 0;
    }

    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(targets.len());

    for token_id in targets {
        let client = client.clone();
        let slug = slug.to_string();
        let sem = Arc::clone(&sem);
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            let offer = client.fetch_best_offer(&slug, &token_id).await;
            (token_id, offer)
        }));
    }

    // Completion order is irrelevant: attribution is by token id.
    let mut offers: HashMap<String, Decimal> = HashMap::new();
    for joined in join_all(handles).await {
        match joined {
            Ok((token_id, Some(offer))) => {
                offers.insert(token_id, offer);
            }
            Ok((_, None)) => {}
            Err(e) => warn!("offer task failed to join: {e}"),
        }
    }

    let mut set = 0;
    for listing in listings.iter_mut() {
        if listing.highest_offer.is_none() {
            if let Some(offer) = offers.get(&listing.token_id) {
                listing.highest_offer = Some(*offer);
                set += 1;
            }
        }
    }
    set
}
