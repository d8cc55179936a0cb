//! Price resolver - cache-backed priority cascade over quote sources
//!
//! Sources are tried in a fixed order; the first valid quote wins, is
//! cached, and is returned. Callers display the winning source, so the
//! order is a correctness requirement, not a performance hint.

use std::sync::Arc;

use crate::oracle::cache::FeedCache;
use crate::oracle::sources::{first_valid, QuoteSource};
use crate::types::{normalize_symbol, Quote};

pub struct PriceResolver {
    sources: Vec<Box<dyn QuoteSource>>,
    cache: Arc<FeedCache>,
}

impl PriceResolver {
    pub fn new(sources: Vec<Box<dyn QuoteSource>>, cache: Arc<FeedCache>) -> Self {
        Self { sources, cache }
    }

    /// Source names in cascade priority order.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve a spot price for `symbol`.
    ///
    /// Returns `None` when every source fails or produces invalid data;
    /// callers must treat that as a normal "currently unavailable" outcome,
    /// never as a fault.
    pub async fn get_price(&self, symbol: &str) -> Option<Quote> {
        let symbol = normalize_symbol(symbol);

        if let Some(hit) = self.cache.get_quote(&symbol) {
            tracing::debug!(symbol = %symbol, source = hit.source, "cache hit");
            return Some(hit);
        }

        match first_valid(&self.sources, &symbol, None).await {
            Some(quote) => {
                tracing::info!(
                    symbol = %symbol,
                    price = quote.price,
                    source = quote.source,
                    "price resolved"
                );
                self.cache.put_quote(quote.clone());
                Some(quote)
            }
            None => {
                tracing::warn!(symbol = %symbol, "all price sources failed");
                None
            }
        }
    }
}
