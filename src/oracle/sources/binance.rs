//! Binance REST clients for spot prices and perpetual funding rates
//!
//! Spot quotes come from the public ticker endpoint and are restricted to
//! an allow-list of symbols with a USDT pair. Funding rates come from the
//! futures premium index endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::SourceError;
use crate::oracle::sources::{FundingSource, QuoteSource};
use crate::types::{now_ms, FundingRate, Quote, HOURS_PER_YEAR};

const BINANCE_SPOT_URL: &str = "https://api.binance.com/api/v3/ticker/price";
const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com/fapi/v1/premiumIndex";

const SPOT_SOURCE_NAME: &str = "binance-spot";
const SPOT_CONFIDENCE: f64 = 0.95;
const EXCHANGE_NAME: &str = "binance";

fn usdt_pair(symbol: &str) -> String {
    format!("{symbol}USDT")
}

pub struct BinanceSpotSource {
    client: reqwest::Client,
    allowed: HashSet<String>,
}

impl BinanceSpotSource {
    pub fn new(client: reqwest::Client, allowed: &[String]) -> Self {
        Self {
            client,
            allowed: allowed.iter().cloned().collect(),
        }
    }

    async fn read(&self, symbol: &str) -> Result<Quote> {
        if !self.allowed.contains(symbol) {
            return Err(SourceError::UnsupportedSymbol(symbol.to_string()).into());
        }

        let response = self
            .client
            .get(BINANCE_SPOT_URL)
            .query(&[("symbol", usdt_pair(symbol))])
            .send()
            .await
            .context("Binance spot request failed")?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Binance spot returned malformed JSON")?;

        parse_spot_payload(symbol, &body)
    }
}

/// Pull `{"symbol":"BTCUSDT","price":"65000.50"}` apart.
fn parse_spot_payload(symbol: &str, body: &serde_json::Value) -> Result<Quote> {
    let price = body["price"]
        .as_str()
        .ok_or_else(|| SourceError::MalformedPayload("missing price".to_string()))?
        .parse::<f64>()
        .context("price is not a number")?;

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        timestamp: now_ms(),
        source: SPOT_SOURCE_NAME,
        confidence: SPOT_CONFIDENCE,
    })
}

#[async_trait]
impl QuoteSource for BinanceSpotSource {
    fn name(&self) -> &'static str {
        SPOT_SOURCE_NAME
    }

    async fn fetch_quote(&self, symbol: &str) -> Option<Quote> {
        match self.read(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(source = SPOT_SOURCE_NAME, symbol, error = %e, "fetch failed");
                None
            }
        }
    }
}

pub struct BinanceFundingSource {
    client: reqwest::Client,
}

impl BinanceFundingSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(&self, symbol: &str) -> Result<FundingRate> {
        let response = self
            .client
            .get(BINANCE_FUTURES_URL)
            .query(&[("symbol", usdt_pair(symbol))])
            .send()
            .await
            .context("Binance premium index request failed")?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Binance premium index returned malformed JSON")?;

        parse_funding_payload(symbol, &body)
    }
}

/// Pull `{"lastFundingRate":"0.0001","nextFundingTime":...,"time":...}` apart.
fn parse_funding_payload(symbol: &str, body: &serde_json::Value) -> Result<FundingRate> {
    let raw_rate = body["lastFundingRate"]
        .as_str()
        .ok_or_else(|| SourceError::MalformedPayload("missing lastFundingRate".to_string()))?
        .parse::<f64>()
        .context("lastFundingRate is not a number")?;

    let next_funding_time = body["nextFundingTime"].as_i64().unwrap_or(0);
    let timestamp = body["time"].as_i64().unwrap_or_else(now_ms);

    Ok(FundingRate {
        symbol: symbol.to_string(),
        rate: raw_rate * HOURS_PER_YEAR,
        timestamp,
        exchange: EXCHANGE_NAME,
        next_funding_time,
    })
}

#[async_trait]
impl FundingSource for BinanceFundingSource {
    fn exchange(&self) -> &'static str {
        EXCHANGE_NAME
    }

    async fn fetch_funding(&self, symbol: &str) -> Option<FundingRate> {
        match self.read(symbol).await {
            Ok(rate) => Some(rate),
            Err(e) => {
                tracing::warn!(exchange = EXCHANGE_NAME, symbol, error = %e, "funding fetch failed");
                None
            }
        }
    }
}
