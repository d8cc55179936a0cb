//! Funding rate aggregator - concurrent fan-out across exchanges
//!
//! Unlike the price cascade, funding rates from different exchanges are
//! distinct, simultaneously-valid data points, so all exchanges are queried
//! in parallel and every survivor is returned.

use futures_util::future::join_all;
use std::sync::Arc;

use crate::oracle::cache::FeedCache;
use crate::oracle::sources::FundingSource;
use crate::types::{normalize_symbol, FundingRate};

pub struct FundingRateAggregator {
    exchanges: Vec<Box<dyn FundingSource>>,
    cache: Arc<FeedCache>,
}

impl FundingRateAggregator {
    pub fn new(exchanges: Vec<Box<dyn FundingSource>>, cache: Arc<FeedCache>) -> Self {
        Self { exchanges, cache }
    }

    /// Names of the exchanges queried on every fan-out.
    pub fn exchange_names(&self) -> Vec<&'static str> {
        self.exchanges.iter().map(|x| x.exchange()).collect()
    }

    /// Collect current annualized funding rates for `symbol` from every
    /// exchange that answers with a well-formed payload.
    ///
    /// An empty vec means no exchange had data; it is a normal outcome,
    /// never an error, and is not cached.
    pub async fn get_funding_rates(&self, symbol: &str) -> Vec<FundingRate> {
        let symbol = normalize_symbol(symbol);

        if let Some(hit) = self.cache.get_funding(&symbol) {
            tracing::debug!(symbol = %symbol, exchanges = hit.len(), "funding cache hit");
            return hit;
        }

        let requests = self
            .exchanges
            .iter()
            .map(|exchange| exchange.fetch_funding(&symbol));
        let rates: Vec<FundingRate> = join_all(requests).await.into_iter().flatten().collect();

        if rates.is_empty() {
            tracing::warn!(symbol = %symbol, "no exchange returned funding data");
        } else {
            tracing::info!(symbol = %symbol, exchanges = rates.len(), "funding rates resolved");
            self.cache.put_funding(&symbol, rates.clone());
        }

        rates
    }
}
