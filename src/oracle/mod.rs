//! Price feed facade - wires sources, cache, resolver, and scheduler
//!
//! `PriceFeed` is the single entry point: spot prices come from a fixed
//! priority cascade of five sources, funding rates from a concurrent
//! fan-out over three exchanges, both fronted by a shared TTL cache.

pub mod cache;
pub mod funding;
pub mod resolver;
pub mod scheduler;
pub mod sources;

pub use cache::FeedCache;
pub use funding::FundingRateAggregator;
pub use resolver::PriceResolver;
pub use scheduler::RefreshScheduler;

use anyhow::{Context, Result};
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use std::time::Duration;

use crate::config::FeedConfig;
use crate::types::{FundingRate, Quote};
use sources::{
    BinanceFundingSource, BinanceSpotSource, BybitFundingSource, FundingSource, IndexApiSource,
    LegacyOracleSource, OkxFundingSource, OracleHubSource, PythSource, QuoteSource,
};

pub struct PriceFeed {
    resolver: Arc<PriceResolver>,
    funding: Arc<FundingRateAggregator>,
    scheduler: RefreshScheduler,
}

impl PriceFeed {
    /// Build the full feed from configuration: one shared RPC provider for
    /// the on-chain sources, one shared HTTP client for the REST sources.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let provider = Arc::new(
            Provider::<Http>::try_from(config.chain.rpc_url.as_str())
                .context("Invalid chain RPC URL")?,
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sources.http_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let cache = Arc::new(FeedCache::new(Duration::from_secs(config.cache.ttl_secs)));

        // Cascade priority order is load-bearing: on-chain hub first,
        // exchange spot last.
        let quote_sources: Vec<Box<dyn QuoteSource>> = vec![
            Box::new(OracleHubSource::new(
                provider.clone(),
                &config.sources.oracle_contracts,
            )),
            Box::new(IndexApiSource::new(
                client.clone(),
                config.sources.index_api_url.clone(),
                config.sources.index_ids.clone(),
            )),
            Box::new(LegacyOracleSource::new(provider.clone(), &config.sources)?),
            Box::new(PythSource::new(
                provider,
                &config.sources.pyth_contract,
                &config.sources.pyth_feed_ids,
            )?),
            Box::new(BinanceSpotSource::new(
                client.clone(),
                &config.sources.exchange_symbols,
            )),
        ];

        let funding_sources: Vec<Box<dyn FundingSource>> = vec![
            Box::new(BinanceFundingSource::new(client.clone())),
            Box::new(BybitFundingSource::new(client.clone())),
            Box::new(OkxFundingSource::new(client)),
        ];

        let resolver = Arc::new(PriceResolver::new(quote_sources, cache.clone()));
        let funding = Arc::new(FundingRateAggregator::new(funding_sources, cache));
        let scheduler = RefreshScheduler::new(
            resolver.clone(),
            funding.clone(),
            config.refresh.watchlist.clone(),
            Duration::from_secs(config.refresh.period_secs),
        );

        tracing::info!(
            cascade = ?resolver.source_names(),
            exchanges = ?funding.exchange_names(),
            ttl_secs = config.cache.ttl_secs,
            "price feed initialized"
        );

        Ok(Self {
            resolver,
            funding,
            scheduler,
        })
    }

    /// Resolve a spot price, served from cache when fresh.
    pub async fn get_price(&self, symbol: &str) -> Option<Quote> {
        self.resolver.get_price(symbol).await
    }

    /// Collect annualized funding rates from every responding exchange.
    pub async fn get_funding_rates(&self, symbol: &str) -> Vec<FundingRate> {
        self.funding.get_funding_rates(symbol).await
    }

    /// Start background refreshing of the configured watch-list. No-op if
    /// already running.
    pub fn start_periodic_refresh(&self) {
        self.scheduler.start();
    }

    /// Stop background refreshing. Dropping the feed also stops it.
    pub fn stop_periodic_refresh(&self) {
        self.scheduler.stop();
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> PriceFeed {
        let config = FeedConfig::load().expect("defaults load");
        PriceFeed::new(&config).expect("feed constructs from defaults")
    }

    #[tokio::test]
    async fn test_cascade_order_matches_configuration() {
        let feed = feed();
        assert_eq!(
            feed.resolver.source_names(),
            vec![
                "oracle-hub",
                "index-api",
                "legacy-oracle",
                "pyth",
                "binance-spot"
            ]
        );
    }

    #[tokio::test]
    async fn test_all_three_funding_exchanges_are_wired() {
        let feed = feed();
        assert_eq!(
            feed.funding.exchange_names(),
            vec!["binance", "bybit", "okx"]
        );
    }

    #[tokio::test]
    async fn test_refresh_lifecycle() {
        let feed = feed();
        assert!(!feed.is_refreshing());
        feed.start_periodic_refresh();
        assert!(feed.is_refreshing());
        feed.stop_periodic_refresh();
        assert!(!feed.is_refreshing());
    }
}
