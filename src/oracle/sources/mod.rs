//! Price and funding source implementations (oracle hub, index API,
//! legacy oracle cascade, Pyth, Binance, Bybit, OKX)

mod binance;
mod bybit;
mod index_api;
mod legacy;
mod okx;
mod oracle_hub;
mod pyth;

pub use binance::{BinanceFundingSource, BinanceSpotSource};
pub use bybit::BybitFundingSource;
pub use index_api::IndexApiSource;
pub use legacy::LegacyOracleSource;
pub use okx::OkxFundingSource;
pub use oracle_hub::OracleHubSource;
pub use pyth::PythSource;

use async_trait::async_trait;
use ethers::types::U256;
use std::time::Duration;

use crate::types::{now_ms, FundingRate, Quote};

/// Freshness bound applied to on-chain observations.
pub(crate) const MAX_ONCHAIN_AGE: Duration = Duration::from_secs(3600);

/// Trait for spot price sources.
///
/// Implementations must catch every internal fault (network, decode,
/// malformed payload) and resolve to `None`; a cascade over sources must
/// never abort because one of them failed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Get the source name, as surfaced in `Quote::source`
    fn name(&self) -> &'static str;

    /// Fetch a normalized quote for an uppercase symbol
    async fn fetch_quote(&self, symbol: &str) -> Option<Quote>;
}

/// Trait for perpetual funding-rate sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundingSource: Send + Sync {
    /// Get the exchange name, as surfaced in `FundingRate::exchange`
    fn exchange(&self) -> &'static str;

    /// Fetch the current annualized funding rate for an uppercase symbol
    async fn fetch_funding(&self, symbol: &str) -> Option<FundingRate>;
}

/// Try sources in order and return the first valid quote.
///
/// `max_age` additionally rejects quotes older than the given bound (used by
/// the legacy cascade, whose levels hard-reject stale data). Invalid or
/// missing results fall through to the next source.
pub(crate) async fn first_valid(
    sources: &[Box<dyn QuoteSource>],
    symbol: &str,
    max_age: Option<Duration>,
) -> Option<Quote> {
    for source in sources {
        match source.fetch_quote(symbol).await {
            Some(quote) if !quote.is_valid() => {
                tracing::warn!(
                    source = source.name(),
                    symbol,
                    price = quote.price,
                    "rejected invalid price, trying next source"
                );
            }
            Some(quote) => {
                if let Some(limit) = max_age {
                    let age_ms = now_ms().saturating_sub(quote.timestamp);
                    if age_ms >= limit.as_millis() as i64 {
                        tracing::warn!(
                            source = source.name(),
                            symbol,
                            age_secs = age_ms / 1000,
                            "rejected stale observation, trying next source"
                        );
                        continue;
                    }
                }
                tracing::debug!(source = source.name(), symbol, price = quote.price, "source won");
                return Some(quote);
            }
            None => {
                tracing::debug!(source = source.name(), symbol, "no result, trying next source");
            }
        }
    }
    None
}

/// Lossy conversion of a 256-bit unsigned integer to f64.
///
/// Values too large for f64 become infinity and fail the validity predicate
/// downstream instead of panicking.
pub(crate) fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::NAN)
}

/// Apply a fixed-decimals scale: raw integer value / 10^decimals.
pub(crate) fn scale_by_decimals(raw: f64, decimals: u8) -> f64 {
    raw / 10f64.powi(decimals as i32)
}

/// Apply a power-of-ten exponent: raw integer value * 10^expo.
pub(crate) fn scale_by_expo(raw: f64, expo: i32) -> f64 {
    raw * 10f64.powi(expo)
}
