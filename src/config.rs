use crate::error::{AppError, Result};

pub const OPENSEA_BASE_URL: &str = "https://api.opensea.io/api/v2";
pub const ALCHEMY_MAINNET_URL: &str = "https://eth-mainnet.g.alchemy.com/v2";

/// Rows per upsert/delete batch against the store.
pub const STORE_BATCH_SIZE: usize = 100;

/// Worker count for the per-token best-offer fan-out.
pub const DEFAULT_OFFER_CONCURRENCY: usize = 5;

/// Timeout for paginated collection/ownership reads (seconds).
pub const PAGE_FETCH_TIMEOUT_SECS: u64 = 20;

/// Timeout for single best-offer and eth_call requests (seconds).
pub const SINGLE_FETCH_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    /// OpenSea v2 API key (OPENSEA_API_KEY, required).
    pub opensea_api_key: String,
    pub opensea_base_url: String,
    /// Alchemy NFT API base including the key path segment (ALCHEMY_BASE_URL,
    /// derived from ALCHEMY_API_KEY when unset).
    pub alchemy_base_url: String,
    /// JSON-RPC endpoint for eth_call (ALCHEMY_RPC_URL, defaults to the NFT
    /// API base; Alchemy serves both on the same URL).
    pub alchemy_rpc_url: String,
    /// Custodian contract address holding the secondary-market inventory
    /// (TOKENWORKS_ADDRESS, required).
    pub tokenworks_address: String,
    /// Originals ERC-721 contract (CHECKS_ORIGINALS_CONTRACT, required).
    pub originals_contract: String,
    pub originals_slug: String,
    pub editions_slug: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Bounded worker count for offer enrichment (OFFER_CONCURRENCY).
    pub offer_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let opensea_api_key = require("OPENSEA_API_KEY")?;
        let tokenworks_address = require("TOKENWORKS_ADDRESS")?;
        let originals_contract = require("CHECKS_ORIGINALS_CONTRACT")?;

        let alchemy_base_url = match std::env::var("ALCHEMY_BASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let key = require("ALCHEMY_API_KEY")?;
                format!("{ALCHEMY_MAINNET_URL}/{key}")
            }
        };
        let alchemy_rpc_url =
            std::env::var("ALCHEMY_RPC_URL").unwrap_or_else(|_| alchemy_base_url.clone());

        Ok(Self {
            opensea_api_key,
            opensea_base_url: std::env::var("OPENSEA_BASE_URL")
                .unwrap_or_else(|_| OPENSEA_BASE_URL.to_string()),
            alchemy_base_url,
            alchemy_rpc_url,
            tokenworks_address,
            originals_contract,
            originals_slug: std::env::var("ORIGINALS_SLUG")
                .unwrap_or_else(|_| "vv-checks-originals".to_string()),
            editions_slug: std::env::var("EDITIONS_SLUG")
                .unwrap_or_else(|_| "vv-checks".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "listings.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            offer_concurrency: std::env::var("OFFER_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_OFFER_CONCURRENCY.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_OFFER_CONCURRENCY)
                .max(1),
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("{name} must be set")))
}
