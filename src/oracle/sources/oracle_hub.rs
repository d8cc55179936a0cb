//! Oracle hub source - per-symbol on-chain price oracles on Sei EVM
//!
//! Each configured symbol has its own oracle contract exposing
//! `latestPrice() -> (price, updatedAt, decimals)`. Zero prices are
//! rejected; observations older than one hour are logged but still
//! returned (warn-but-accept, matching the resolution the cascade was
//! tuned against).

use anyhow::Result;
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SourceError;
use crate::oracle::sources::{
    scale_by_decimals, u256_to_f64, QuoteSource, MAX_ONCHAIN_AGE,
};
use crate::types::{now_ms, Quote};

abigen!(
    SeiOracleHub,
    r#"[
        function latestPrice() external view returns (uint256 price, uint256 updatedAt, uint8 decimals)
    ]"#,
);

const SOURCE_NAME: &str = "oracle-hub";
const CONFIDENCE: f64 = 0.98;

pub struct OracleHubSource {
    provider: Arc<Provider<Http>>,
    contracts: HashMap<String, Address>,
}

impl OracleHubSource {
    pub fn new(provider: Arc<Provider<Http>>, contracts: &HashMap<String, String>) -> Self {
        let contracts = contracts
            .iter()
            .filter_map(|(symbol, addr)| match addr.parse::<Address>() {
                Ok(parsed) => Some((symbol.clone(), parsed)),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "invalid oracle contract address, skipping");
                    None
                }
            })
            .collect();

        Self { provider, contracts }
    }

    async fn read(&self, symbol: &str) -> Result<Quote> {
        let address = self
            .contracts
            .get(symbol)
            .ok_or_else(|| SourceError::UnsupportedSymbol(symbol.to_string()))?;

        let hub = SeiOracleHub::new(*address, self.provider.clone());
        let (raw_price, updated_at, decimals) = hub.latest_price().call().await?;

        let raw = u256_to_f64(raw_price);
        if raw == 0.0 {
            return Err(SourceError::InvalidPrice(0.0).into());
        }

        let price = scale_by_decimals(raw, decimals);
        let timestamp = updated_at.low_u64() as i64 * 1000;

        // Stale observations are reported but still accepted here; only the
        // legacy cascade hard-rejects on age.
        let age_ms = now_ms().saturating_sub(timestamp);
        if age_ms >= MAX_ONCHAIN_AGE.as_millis() as i64 {
            tracing::warn!(
                symbol,
                age_secs = age_ms / 1000,
                "oracle hub observation is older than 1h, returning anyway"
            );
        }

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            timestamp,
            source: SOURCE_NAME,
            confidence: CONFIDENCE,
        })
    }
}

#[async_trait]
impl QuoteSource for OracleHubSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch_quote(&self, symbol: &str) -> Option<Quote> {
        match self.read(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(source = SOURCE_NAME, symbol, error = %e, "fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Arc<Provider<Http>> {
        Arc::new(
            Provider::<Http>::try_from("http://localhost:8545").expect("static url parses"),
        )
    }

    #[test]
    fn test_invalid_addresses_are_skipped() {
        let mut contracts = HashMap::new();
        contracts.insert("BTC".to_string(), "not-an-address".to_string());
        contracts.insert(
            "SEI".to_string(),
            "0x4a1Bb1A331a9F0a4A0cd1E5b8f1C5E4d9a7b3c21".to_string(),
        );

        let source = OracleHubSource::new(provider(), &contracts);
        assert!(!source.contracts.contains_key("BTC"));
        assert!(source.contracts.contains_key("SEI"));
    }

    #[tokio::test]
    async fn test_unmapped_symbol_fails_closed() {
        let source = OracleHubSource::new(provider(), &HashMap::new());
        assert!(source.fetch_quote("DOGE").await.is_none());
    }
}
