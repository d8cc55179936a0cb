//! Pyth source - deterministic on-chain price feed on Sei EVM
//!
//! Reads a fixed feed-id -> price mapping from a single Pyth contract.
//! Raw values carry a power-of-ten exponent; zero prices are rejected.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SourceError;
use crate::oracle::sources::{scale_by_expo, QuoteSource};
use crate::types::Quote;

abigen!(
    PythFeed,
    r#"[
        function getPriceUnsafe(bytes32 id) external view returns (int64 price, uint64 conf, int32 expo, uint64 publishTime)
    ]"#,
);

const SOURCE_NAME: &str = "pyth";
const CONFIDENCE: f64 = 0.90;

pub struct PythSource {
    provider: Arc<Provider<Http>>,
    contract: Address,
    feed_ids: HashMap<String, [u8; 32]>,
}

impl PythSource {
    pub fn new(
        provider: Arc<Provider<Http>>,
        contract: &str,
        feed_ids: &HashMap<String, String>,
    ) -> Result<Self> {
        let contract = contract
            .parse::<Address>()
            .map_err(|e| anyhow!("invalid pyth contract address {contract}: {e}"))?;

        let feed_ids = feed_ids
            .iter()
            .filter_map(|(symbol, id)| match parse_feed_id(id) {
                Ok(parsed) => Some((symbol.clone(), parsed)),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "invalid pyth feed id, skipping");
                    None
                }
            })
            .collect();

        Ok(Self {
            provider,
            contract,
            feed_ids,
        })
    }

    async fn read(&self, symbol: &str) -> Result<Quote> {
        let feed_id = self
            .feed_ids
            .get(symbol)
            .ok_or_else(|| SourceError::UnsupportedSymbol(symbol.to_string()))?;

        let feed = PythFeed::new(self.contract, self.provider.clone());
        let (raw_price, _conf, expo, publish_time) =
            feed.get_price_unsafe(*feed_id).call().await?;

        if raw_price == 0 {
            return Err(SourceError::InvalidPrice(0.0).into());
        }

        Ok(Quote {
            symbol: symbol.to_string(),
            price: scale_by_expo(raw_price as f64, expo),
            timestamp: publish_time as i64 * 1000,
            source: SOURCE_NAME,
            confidence: CONFIDENCE,
        })
    }
}

fn parse_feed_id(id: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(id.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("feed id must be 32 bytes"))
}

#[async_trait]
impl QuoteSource for PythSource {
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
