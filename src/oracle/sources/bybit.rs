//! Bybit REST client for perpetual funding rates

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::error::SourceError;
use crate::oracle::sources::FundingSource;
use crate::types::{now_ms, FundingRate, HOURS_PER_YEAR};

const BYBIT_TICKERS_URL: &str = "https://api.bybit.com/v5/market/tickers";

const EXCHANGE_NAME: &str = "bybit";

pub struct BybitFundingSource {
    client: reqwest::Client,
}

impl BybitFundingSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(&self, symbol: &str) -> Result<FundingRate> {
        let pair = format!("{symbol}USDT");
        let response = self
            .client
            .get(BYBIT_TICKERS_URL)
            .query(&[("category", "linear"), ("symbol", &pair)])
            .send()
            .await
            .context("Bybit tickers request failed")?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Bybit tickers returned malformed JSON")?;

        parse_funding_payload(symbol, &body)
    }
}

/// Bybit wraps results in `{"retCode":0,"result":{"list":[{...}]},"time":...}`.
fn parse_funding_payload(symbol: &str, body: &serde_json::Value) -> Result<FundingRate> {
    if body["retCode"].as_i64() != Some(0) {
        return Err(SourceError::MalformedPayload(format!(
            "retCode {}",
            body["retCode"]
        ))
        .into());
    }

    let ticker = body["result"]["list"]
        .as_array()
        .and_then(|list| list.first())
        .ok_or_else(|| SourceError::MalformedPayload("empty ticker list".to_string()))?;

    let raw_rate = ticker["fundingRate"]
        .as_str()
        .ok_or_else(|| SourceError::MalformedPayload("missing fundingRate".to_string()))?
        .parse::<f64>()
        .context("fundingRate is not a number")?;

    let next_funding_time = ticker["nextFundingTime"]
        .as_str()
        .and_then(|t| t.parse::<i64>().ok())
        .unwrap_or(0);

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
impl FundingSource for BybitFundingSource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_funding_payload() {
        let body = json!({
            "retCode": 0,
            "result": {
                "list": [{
                    "symbol": "BTCUSDT",
                    "fundingRate": "0.0002",
                    "nextFundingTime": "1700003600000"
                }]
            },
            "time": 1_700_000_000_000i64
        });
        let rate = parse_funding_payload("BTC", &body).unwrap();
        assert!((rate.rate - 0.0002 * 8760.0).abs() < 1e-12);
        assert_eq!(rate.exchange, "bybit");
        assert_eq!(rate.next_funding_time, 1_700_003_600_000);
    }

    #[test]
    fn test_parse_rejects_error_code_and_empty_list() {
        let err_code = json!({ "retCode": 10001, "result": {} });
        assert!(parse_funding_payload("BTC", &err_code).is_err());

        let empty = json!({ "retCode": 0, "result": { "list": [] } });
        assert!(parse_funding_payload("BTC", &empty).is_err());
    }
}
