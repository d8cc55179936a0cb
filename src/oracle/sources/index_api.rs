//! Index API source - REST price index with a fixed symbol -> id map
//!
//! Symbols without a mapping fail closed: the source returns nothing and
//! the cascade moves on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::SourceError;
use crate::oracle::sources::QuoteSource;
use crate::types::{now_ms, Quote};

const SOURCE_NAME: &str = "index-api";
const CONFIDENCE: f64 = 0.95;

pub struct IndexApiSource {
    client: reqwest::Client,
    base_url: String,
    index_ids: HashMap<String, String>,
}

impl IndexApiSource {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        index_ids: HashMap<String, String>,
    ) -> Self {
        Self {
            client,
            base_url,
            index_ids,
        }
    }

    async fn read(&self, symbol: &str) -> Result<Quote> {
        let id = self
            .index_ids
            .get(symbol)
            .ok_or_else(|| SourceError::UnsupportedSymbol(symbol.to_string()))?;

        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies=usd&include_last_updated_at=true",
            self.base_url, id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("index API request failed")?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("index API returned malformed JSON")?;

        parse_index_payload(symbol, id, &body)
    }
}

/// Pull `{"<id>": {"usd": <price>, "last_updated_at": <secs>}}` apart.
fn parse_index_payload(symbol: &str, id: &str, body: &serde_json::Value) -> Result<Quote> {
    let entry = body
        .get(id)
        .ok_or_else(|| SourceError::MalformedPayload(format!("missing index id {id}")))?;

    let price = entry["usd"]
        .as_f64()
        .ok_or_else(|| SourceError::MalformedPayload("missing usd price".to_string()))?;

    // last_updated_at is optional on some index tiers; fall back to receipt time
    let timestamp = entry["last_updated_at"]
        .as_i64()
        .map(|secs| secs * 1000)
        .unwrap_or_else(now_ms);

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        timestamp,
        source: SOURCE_NAME,
        confidence: CONFIDENCE,
    })
}

#[async_trait]
impl QuoteSource for IndexApiSource {
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
    use serde_json::json;

    #[test]
    fn test_parse_index_payload() {
        let body = json!({
            "bitcoin": { "usd": 65000.5, "last_updated_at": 1_700_000_000 }
        });
        let quote = parse_index_payload("BTC", "bitcoin", &body).unwrap();
        assert_eq!(quote.price, 65000.5);
        assert_eq!(quote.timestamp, 1_700_000_000_000);
        assert_eq!(quote.source, "index-api");
        assert_eq!(quote.confidence, 0.95);
    }

    #[test]
    fn test_parse_missing_price_fails() {
        let body = json!({ "bitcoin": { "last_updated_at": 1_700_000_000 } });
        assert!(parse_index_payload("BTC", "bitcoin", &body).is_err());
    }

    #[test]
    fn test_parse_missing_timestamp_falls_back_to_now() {
        let body = json!({ "sei-network": { "usd": 0.42 } });
        let quote = parse_index_payload("SEI", "sei-network", &body).unwrap();
        assert!(quote.timestamp > 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_unmapped_symbol_fails_closed() {
        let source = IndexApiSource::new(
            reqwest::Client::new(),
            "http://localhost:1".to_string(),
            HashMap::new(),
        );
        assert!(source.fetch_quote("DOGE").await.is_none());
    }
}
