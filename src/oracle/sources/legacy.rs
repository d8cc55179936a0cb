//! Legacy oracle source - three-level on-chain fallback cascade
//!
//! Kept for symbols whose primary oracles predate the hub: a dAPI proxy
//! read, then the Pyth deterministic feed, then a classic aggregator feed
//! (stablecoins only). Each level is hard-validated for <=1h freshness
//! before it can win, reusing the same first-valid primitive as the outer
//! resolver cascade.

use anyhow::Result;
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::oracle::sources::{
    first_valid, scale_by_decimals, PythSource, QuoteSource, MAX_ONCHAIN_AGE,
};
use crate::types::Quote;

abigen!(
    DapiProxy,
    r#"[
        function read() external view returns (int224 value, uint32 timestamp)
    ]"#,
);

abigen!(
    ClassicAggregator,
    r#"[
        function latestRoundData() external view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound)
        function decimals() external view returns (uint8)
    ]"#,
);

const SOURCE_NAME: &str = "legacy-oracle";
const CONFIDENCE: f64 = 0.95;

/// dAPI values are fixed-point with 18 decimals.
const DAPI_DECIMALS: u8 = 18;

pub struct LegacyOracleSource {
    allowed: HashSet<String>,
    levels: Vec<Box<dyn QuoteSource>>,
}

impl LegacyOracleSource {
    pub fn new(provider: Arc<Provider<Http>>, sources: &SourcesConfig) -> Result<Self> {
        let levels: Vec<Box<dyn QuoteSource>> = vec![
            Box::new(DapiSource::new(provider.clone(), &sources.dapi_proxies)),
            Box::new(PythSource::new(
                provider.clone(),
                &sources.pyth_contract,
                &sources.pyth_feed_ids,
            )?),
            Box::new(ClassicFeedSource::new(provider, &sources.classic_feeds)),
        ];

        Ok(Self {
            allowed: sources.legacy_symbols.iter().cloned().collect(),
            levels,
        })
    }
}

#[async_trait]
impl QuoteSource for LegacyOracleSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch_quote(&self, symbol: &str) -> Option<Quote> {
        if !self.allowed.contains(symbol) {
            tracing::debug!(source = SOURCE_NAME, symbol, "symbol not on legacy allow-list");
            return None;
        }

        // The quote surfaces this adapter's id; the winning level is only
        // logged.
        let quote = first_valid(&self.levels, symbol, Some(MAX_ONCHAIN_AGE)).await?;
        tracing::debug!(source = SOURCE_NAME, symbol, level = quote.source, "legacy level won");
        Some(Quote {
            source: SOURCE_NAME,
            confidence: CONFIDENCE,
            ..quote
        })
    }
}

/// Level 1: per-symbol dAPI proxy contracts.
struct DapiSource {
    provider: Arc<Provider<Http>>,
    proxies: HashMap<String, Address>,
}

impl DapiSource {
    fn new(provider: Arc<Provider<Http>>, proxies: &HashMap<String, String>) -> Self {
        let proxies = proxies
            .iter()
            .filter_map(|(symbol, addr)| match addr.parse::<Address>() {
                Ok(parsed) => Some((symbol.clone(), parsed)),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "invalid dAPI proxy address, skipping");
                    None
                }
            })
            .collect();
        Self { provider, proxies }
    }

    async fn read(&self, symbol: &str) -> Result<Quote> {
        let address = self
            .proxies
            .get(symbol)
            .ok_or_else(|| SourceError::UnsupportedSymbol(symbol.to_string()))?;

        let proxy = DapiProxy::new(*address, self.provider.clone());
        let (value, timestamp) = proxy.read().call().await?;

        let raw = value.to_string().parse::<f64>().unwrap_or(f64::NAN);
        Ok(Quote {
            symbol: symbol.to_string(),
            price: scale_by_decimals(raw, DAPI_DECIMALS),
            timestamp: timestamp as i64 * 1000,
            source: "dapi",
            confidence: CONFIDENCE,
        })
    }
}

#[async_trait]
impl QuoteSource for DapiSource {
    fn name(&self) -> &'static str {
        "dapi"
    }

    async fn fetch_quote(&self, symbol: &str) -> Option<Quote> {
        match self.read(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(source = "dapi", symbol, error = %e, "fetch failed");
                None
            }
        }
    }
}

/// Level 3: classic aggregator feeds, configured for USDC/USDT only.
struct ClassicFeedSource {
    provider: Arc<Provider<Http>>,
    feeds: HashMap<String, Address>,
}

impl ClassicFeedSource {
    fn new(provider: Arc<Provider<Http>>, feeds: &HashMap<String, String>) -> Self {
        let feeds = feeds
            .iter()
            .filter_map(|(symbol, addr)| match addr.parse::<Address>() {
                Ok(parsed) => Some((symbol.clone(), parsed)),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "invalid classic feed address, skipping");
                    None
                }
            })
            .collect();
        Self { provider, feeds }
    }

    async fn read(&self, symbol: &str) -> Result<Quote> {
        let address = self
            .feeds
            .get(symbol)
            .ok_or_else(|| SourceError::UnsupportedSymbol(symbol.to_string()))?;

        let feed = ClassicAggregator::new(*address, self.provider.clone());
        let decimals = feed.decimals().call().await?;
        let (_round_id, answer, _started_at, updated_at, _answered_in) =
            feed.latest_round_data().call().await?;

        let raw = answer.to_string().parse::<f64>().unwrap_or(f64::NAN);
        Ok(Quote {
            symbol: symbol.to_string(),
            price: scale_by_decimals(raw, decimals),
            timestamp: updated_at.low_u64() as i64 * 1000,
            source: "classic-feed",
            confidence: CONFIDENCE,
        })
    }
}

#[async_trait]
impl QuoteSource for ClassicFeedSource {
    fn name(&self) -> &'static str {
        "classic-feed"
    }

    async fn fetch_quote(&self, symbol: &str) -> Option<Quote> {
        match self.read(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(source = "classic-feed", symbol, error = %e, "fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;

    fn legacy_source() -> LegacyOracleSource {
        let cfg = FeedConfig::load().expect("defaults load");
        let provider =
            Arc::new(Provider::<Http>::try_from("http://localhost:8545").expect("static url"));
        LegacyOracleSource::new(provider, &cfg.sources).expect("constructs from defaults")
    }

    #[tokio::test]
    async fn test_symbol_outside_allow_list_fails_closed() {
        let source = legacy_source();
        assert!(source.fetch_quote("DOGE").await.is_none());
    }

    #[test]
    fn test_three_levels_in_order() {
        let source = legacy_source();
        assert_eq!(source.levels.len(), 3);
        assert_eq!(source.levels[0].name(), "dapi");
        assert_eq!(source.levels[1].name(), "pyth");
        assert_eq!(source.levels[2].name(), "classic-feed");
    }

    #[tokio::test]
    async fn test_winning_level_is_surfaced_as_this_adapter() {
        use crate::oracle::sources::MockQuoteSource;
        use crate::types::now_ms;

        let mut level = MockQuoteSource::new();
        level.expect_name().return_const("dapi");
        level.expect_fetch_quote().returning(|s| {
            Some(Quote {
                symbol: s.to_string(),
                price: 1.0,
                timestamp: now_ms(),
                source: "dapi",
                confidence: 0.5,
            })
        });

        let source = LegacyOracleSource {
            allowed: ["USDC".to_string()].into_iter().collect(),
            levels: vec![Box::new(level)],
        };
        let quote = source.fetch_quote("USDC").await.unwrap();
        assert_eq!(quote.source, "legacy-oracle");
        assert_eq!(quote.confidence, 0.95);
    }

    #[test]
    fn test_stablecoins_are_allowed() {
        let source = legacy_source();
        assert!(source.allowed.contains("USDC"));
        assert!(source.allowed.contains("USDT"));
        assert!(!source.allowed.contains("DOGE"));
    }
}
