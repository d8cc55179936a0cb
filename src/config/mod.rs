//! Configuration management for PriceCast
//!
//! Loads defaults + environment variables via .env. Every source address,
//! feed id, and endpoint can be overridden with PRICECAST__* variables.

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;

use crate::types::normalize_symbol;

/// Main feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub chain: ChainConfig,
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Sei EVM JSON-RPC endpoint
    pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Per-symbol oracle-hub contract addresses (adapter 1)
    pub oracle_contracts: HashMap<String, String>,
    /// Index price REST API base URL (adapter 2)
    pub index_api_url: String,
    /// Symbol -> index id map for the index API; unmapped symbols fail closed
    pub index_ids: HashMap<String, String>,
    /// Per-symbol dAPI proxy addresses (legacy cascade level 1)
    pub dapi_proxies: HashMap<String, String>,
    /// Symbols the legacy cascade is allowed to serve
    pub legacy_symbols: Vec<String>,
    /// Classic aggregator feed addresses (legacy cascade level 3, stablecoins only)
    pub classic_feeds: HashMap<String, String>,
    /// Pyth price contract address (adapter 4 and legacy cascade level 2)
    pub pyth_contract: String,
    /// Symbol -> Pyth feed id (hex, 32 bytes)
    pub pyth_feed_ids: HashMap<String, String>,
    /// Symbols with a tradable USDT spot pair on the exchange (adapter 5)
    pub exchange_symbols: Vec<String>,
    /// HTTP timeout for all REST sources, in seconds
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for cached quotes and funding rates, in seconds
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Background refresh period, in seconds
    pub period_secs: u64,
    /// Symbols refreshed proactively every tick
    pub watchlist: Vec<String>,
}

impl FeedConfig {
    /// Load configuration from defaults and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Chain defaults (Sei EVM mainnet)
            .set_default("chain.rpc_url", "https://evm-rpc.sei-apis.com")?
            // Adapter 1: per-symbol oracle-hub contracts
            .set_default(
                "sources.oracle_contracts.SEI",
                "0x4a1Bb1A331a9F0a4A0cd1E5b8f1C5E4d9a7b3c21",
            )?
            .set_default(
                "sources.oracle_contracts.BTC",
                "0x8F3aD62bD7b8d9D1f0a6E45c3b2A91e0C4d5F672",
            )?
            .set_default(
                "sources.oracle_contracts.ETH",
                "0xB27cE91a4F0d3b6a8E5c2D19f7A8b4C3e6D0f183",
            )?
            // Adapter 2: index price API
            .set_default("sources.index_api_url", "https://api.coingecko.com")?
            .set_default("sources.index_ids.BTC", "bitcoin")?
            .set_default("sources.index_ids.ETH", "ethereum")?
            .set_default("sources.index_ids.SEI", "sei-network")?
            // Legacy cascade: dAPI proxies, allow-list, classic feeds
            .set_default(
                "sources.dapi_proxies.SEI",
                "0x1D5a8c3F0b7E2d9A4c6B8e1F3a5D7c9E2b4F6081",
            )?
            .set_default(
                "sources.dapi_proxies.BTC",
                "0x9C2eF74a1B5d8E3c0A6f4D2b7E9c1A3f5B8d0E64",
            )?
            .set_default(
                "sources.dapi_proxies.ETH",
                "0x6E8bD31c9A4f7B2e5D0c8F6a1B3d5E7c9F2a4B06",
            )?
            .set_default(
                "sources.legacy_symbols",
                vec!["SEI", "BTC", "ETH", "USDC", "USDT"],
            )?
            .set_default(
                "sources.classic_feeds.USDC",
                "0x3cA8F21b6E9d4A7c1B5e8D0f2C4a6E8b1D3f5A92",
            )?
            .set_default(
                "sources.classic_feeds.USDT",
                "0x7B4dA92c5E1f8B3a6D9c0E2f4A6b8D1c3E5f7A08",
            )?
            // Pyth on Sei EVM
            .set_default(
                "sources.pyth_contract",
                "0x2880aB155794e7179c9eE2e38200202908C17B43",
            )?
            .set_default(
                "sources.pyth_feed_ids.BTC",
                "e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43",
            )?
            .set_default(
                "sources.pyth_feed_ids.ETH",
                "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace",
            )?
            .set_default(
                "sources.pyth_feed_ids.SEI",
                "53614f1cb0c031d4af66c04cb9c756234adad0e1cee85303795091499a4084eb",
            )?
            // Adapter 5: exchange spot allow-list
            .set_default("sources.exchange_symbols", vec!["BTC", "ETH", "SEI"])?
            .set_default("sources.http_timeout_secs", 10)?
            // Cache / refresh defaults
            .set_default("cache.ttl_secs", 30)?
            .set_default("refresh.period_secs", 30)?
            .set_default("refresh.watchlist", vec!["SEI", "BTC", "ETH"])?
            // Override with environment variables (PRICECAST__*)
            .add_source(Environment::with_prefix("PRICECAST").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let mut feed_config: FeedConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        feed_config.normalize_symbols();

        Ok(feed_config)
    }

    /// The config backend lowercases key paths, so symbol-keyed maps come
    /// out of deserialization with lowercase keys. Rebuild them with the
    /// canonical uppercase form every source looks up, and normalize the
    /// symbol lists the same way.
    fn normalize_symbols(&mut self) {
        let sources = &mut self.sources;
        for map in [
            &mut sources.oracle_contracts,
            &mut sources.index_ids,
            &mut sources.dapi_proxies,
            &mut sources.classic_feeds,
            &mut sources.pyth_feed_ids,
        ] {
            *map = map
                .drain()
                .map(|(symbol, value)| (normalize_symbol(&symbol), value))
                .collect();
        }

        for symbol in sources
            .legacy_symbols
            .iter_mut()
            .chain(sources.exchange_symbols.iter_mut())
            .chain(self.refresh.watchlist.iter_mut())
        {
            *symbol = normalize_symbol(symbol);
        }
    }

    /// Generate a digest of the config for startup logging
    pub fn digest(&self) -> String {
        format!(
            "rpc={} watchlist={:?} ttl={}s refresh={}s",
            self.chain.rpc_url,
            self.refresh.watchlist,
            self.cache.ttl_secs,
            self.refresh.period_secs
        )
    }
}

impl std::fmt::Display for FeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load() {
        let cfg = FeedConfig::load().expect("defaults must load");
        assert_eq!(cfg.cache.ttl_secs, 30);
        assert_eq!(cfg.refresh.period_secs, 30);
        assert!(cfg.refresh.watchlist.contains(&"SEI".to_string()));
        assert_eq!(cfg.sources.index_ids.get("BTC").unwrap(), "bitcoin");
        assert!(cfg.sources.legacy_symbols.contains(&"USDC".to_string()));
    }

    #[test]
    fn test_symbol_maps_are_keyed_uppercase() {
        // The config backend lowercases key paths during deserialization;
        // loading must restore the uppercase symbols the sources look up.
        let cfg = FeedConfig::load().expect("defaults must load");
        assert!(cfg.sources.oracle_contracts.contains_key("BTC"));
        assert!(cfg.sources.index_ids.contains_key("SEI"));
        assert!(cfg.sources.dapi_proxies.contains_key("ETH"));
        assert!(cfg.sources.classic_feeds.contains_key("USDC"));
        assert!(cfg.sources.pyth_feed_ids.contains_key("BTC"));

        let all_keys = cfg
            .sources
            .oracle_contracts
            .keys()
            .chain(cfg.sources.index_ids.keys())
            .chain(cfg.sources.dapi_proxies.keys())
            .chain(cfg.sources.classic_feeds.keys())
            .chain(cfg.sources.pyth_feed_ids.keys());
        for key in all_keys {
            assert_eq!(key, &key.to_uppercase());
        }
    }
}
