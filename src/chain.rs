use std::time::Duration;

use ethereum_types::U256;
use serde_json::{json, Value};
use sha3::Digest as _;
use tracing::warn;

use crate::config::{Config, PAGE_FETCH_TIMEOUT_SECS, SINGLE_FETCH_TIMEOUT_SECS};
use crate::error::{AppError, Result};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut h = sha3::Keccak256::new();
    h.update(data);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(&out);
    b
}

/// 4-byte function selector plus one uint256 argument, hex-encoded for
/// eth_call.
fn encode_call_u256(signature: &str, arg: U256) -> String {
    let selector = keccak256(signature.as_bytes());
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector[..4]);
    let mut word = [0u8; 32];
    arg.to_big_endian(&mut word);
    data.extend_from_slice(&word);
    format!("0x{}", hex::encode(data))
}

// ---------------------------------------------------------------------------
// RpcClient: read-only contract views over JSON-RPC
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl RpcClient {
    pub fn new(rpc_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SINGLE_FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, rpc_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.alchemy_rpc_url.clone())
    }

    /// `nftForSale(uint256) -> uint256` view call against the secondary
    /// marketplace contract. Returns the sale price in wei; zero is the
    /// contract's "not for sale" marker.
    pub async fn nft_for_sale(&self, contract: &str, token_id: &str) -> Result<U256> {
        let tid = U256::from_dec_str(token_id)
            .map_err(|e| AppError::Chain(format!("bad token id {token_id}: {e:?}")))?;
        let call_data = encode_call_u256("nftForSale(uint256)", tid);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": contract, "data": call_data }, "latest"],
        });

        let resp: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.get("error") {
            return Err(AppError::Chain(format!("eth_call failed: {err}")));
        }
        let result = resp
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Chain("eth_call returned no result".to_string()))?;

        let raw = result.trim().trim_start_matches("0x");
        if raw.is_empty() {
            return Ok(U256::zero());
        }
        U256::from_str_radix(raw, 16)
            .map_err(|e| AppError::Chain(format!("bad eth_call result {result}: {e:?}")))
    }
}

// ---------------------------------------------------------------------------
// OwnershipClient: paginated holdings enumeration
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct OwnershipClient {
    http: reqwest::Client,
    base_url: String,
}

impl OwnershipClient {
    pub fn new(base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PAGE_FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.alchemy_base_url.clone())
    }

    /// Enumerate every token of `contract` held by `owner`, following the
    /// pageKey cursor until the API stops returning one. Token ids come back
    /// hex-encoded and are normalized to decimal strings. A failed page
    /// truncates the enumeration to what was accumulated so far.
    pub async fn owned_token_ids(&self, owner: &str, contract: &str) -> Vec<String> {
        let url = format!("{}/getNFTs", self.base_url);

        let mut token_ids: Vec<String> = Vec::new();
        let mut page_key: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("owner", owner),
                ("contractAddresses[]", contract),
                ("withMetadata", "false"),
            ];
            if let Some(ref key) = page_key {
                query.push(("pageKey", key.as_str()));
            }

            let page: Value = match self.get_json(&url, &query).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        "ownership enumeration truncated after {} tokens: {e}",
                        token_ids.len()
                    );
                    break;
                }
            };

            if let Some(items) = page.get("ownedNfts").and_then(Value::as_array) {
                for nft in items {
                    let raw = nft
                        .get("id")
                        .and_then(|id| id.get("tokenId"))
                        .and_then(Value::as_str);
                    match raw.map(hex_token_to_decimal) {
                        Some(Some(token_id)) => token_ids.push(token_id),
                        Some(None) => warn!("skipping unparseable owned token id: {raw:?}"),
                        None => {}
                    }
                }
            }

            page_key = page
                .get("pageKey")
                .and_then(Value::as_str)
                .map(str::to_string);
            if page_key.is_none() {
                break;
            }
        }

        token_ids
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        Ok(self
            .http
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?)
    }
}

/// "0x04d2" → "1234". The store keys rows by decimal token ids everywhere.
fn hex_token_to_decimal(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches("0x");
    U256::from_str_radix(trimmed, 16).ok().map(|id| id.to_string())
}
