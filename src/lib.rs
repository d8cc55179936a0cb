//! PriceCast Library
//!
//! Multi-source price feed for Sei-network assets: spot prices from a
//! priority cascade of on-chain and REST oracles, perpetual funding rates
//! aggregated across exchanges, with TTL caching and background refresh.

pub mod config;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod types;

pub use config::FeedConfig;
pub use oracle::PriceFeed;
pub use types::{FundingRate, Quote};
