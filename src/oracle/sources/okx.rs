//! OKX REST client for perpetual funding rates

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::error::SourceError;
use crate::oracle::sources::FundingSource;
use crate::types::{now_ms, FundingRate, HOURS_PER_YEAR};

const OKX_FUNDING_URL: &str = "https://www.okx.com/api/v5/public/funding-rate";

const EXCHANGE_NAME: &str = "okx";

pub struct OkxFundingSource {
    client: reqwest::Client,
}

impl OkxFundingSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(&self, symbol: &str) -> Result<FundingRate> {
        let inst_id = format!("{symbol}-USDT-SWAP");
        let response = self
            .client
            .get(OKX_FUNDING_URL)
            .query(&[("instId", &inst_id)])
            .send()
            .await
            .context("OKX funding-rate request failed")?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("OKX funding-rate returned malformed JSON")?;

        parse_funding_payload(symbol, &body)
    }
}

/// OKX wraps results in `{"code":"0","data":[{...}]}` with string numbers.
fn parse_funding_payload(symbol: &str, body: &serde_json::Value) -> Result<FundingRate> {
    if body["code"].as_str() != Some("0") {
        return Err(
            SourceError::MalformedPayload(format!("code {}", body["code"])).into(),
        );
    }

    let entry = body["data"]
        .as_array()
        .and_then(|data| data.first())
        .ok_or_else(|| SourceError::MalformedPayload("empty data array".to_string()))?;

    let raw_rate = entry["fundingRate"]
        .as_str()
        .ok_or_else(|| SourceError::MalformedPayload("missing fundingRate".to_string()))?
        .parse::<f64>()
        .context("fundingRate is not a number")?;

    let next_funding_time = entry["nextFundingTime"]
        .as_str()
        .and_then(|t| t.parse::<i64>().ok())
        .unwrap_or(0);

    let timestamp = entry["fundingTime"]
        .as_str()
        .and_then(|t| t.parse::<i64>().ok())
        .unwrap_or_else(now_ms);

    Ok(FundingRate {
        symbol: symbol.to_string(),
        rate: raw_rate * HOURS_PER_YEAR,
        timestamp,
        exchange: EXCHANGE_NAME,
        next_funding_time,
    })
}

#[async_trait]
impl FundingSource for OkxFundingSource {
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
            "code": "0",
            "data": [{
                "instId": "BTC-USDT-SWAP",
                "fundingRate": "-0.00005",
                "fundingTime": "1700000000000",
                "nextFundingTime": "1700028800000"
            }]
        });
        let rate = parse_funding_payload("BTC", &body).unwrap();
        assert!((rate.rate - (-0.00005 * 8760.0)).abs() < 1e-12);
        assert_eq!(rate.exchange, "okx");
        assert_eq!(rate.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_parse_rejects_error_code_and_empty_data() {
        assert!(parse_funding_payload("BTC", &json!({ "code": "50011", "data": [] })).is_err());
        assert!(parse_funding_payload("BTC", &json!({ "code": "0", "data": [] })).is_err());
    }
}
