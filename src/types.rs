//! Core types used throughout PriceCast
//!
//! Defines the normalized price and funding-rate observations that every
//! source produces and every caller consumes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hours in a (non-leap) year; used to annualize hourly funding rates.
///
/// Compatibility constant: exchanges report a raw periodic rate and we
/// annualize assuming 1-hour periods regardless of the venue's actual
/// funding interval. Callers must not re-annualize.
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// A validated spot price observation with provenance and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Uppercase ticker (e.g. "BTC")
    pub symbol: String,
    /// Price in USD; finite and strictly positive for any stored quote
    pub price: f64,
    /// When the value was produced or observed (epoch milliseconds)
    pub timestamp: i64,
    /// Identifier of the source that produced it
    pub source: &'static str,
    /// Static per-source reliability score in [0, 1]
    pub confidence: f64,
}

impl Quote {
    /// A quote is usable only if its price is a real, positive number.
    /// Zero, negative, NaN, and infinite prices all fail.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ${:.4} via {} (conf {:.2})",
            self.symbol, self.price, self.source, self.confidence
        )
    }
}

/// One exchange's funding observation for a perpetual contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRate {
    /// Uppercase ticker (e.g. "BTC")
    pub symbol: String,
    /// Annualized funding rate (raw periodic rate x 8760)
    pub rate: f64,
    /// Observation time (epoch milliseconds)
    pub timestamp: i64,
    /// Exchange that reported the rate
    pub exchange: &'static str,
    /// Next funding settlement time (epoch milliseconds)
    pub next_funding_time: i64,
}

impl fmt::Display for FundingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2}% APR on {}",
            self.symbol,
            self.rate * 100.0,
            self.exchange
        )
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Normalize a caller-supplied symbol to the canonical uppercase form.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
