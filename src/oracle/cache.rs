//! Feed cache - time-bounded store for quotes and funding rates
//!
//! Entries expire on read; stale entries are never purged proactively, they
//! are simply ignored and overwritten by the next successful fetch.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::types::{FundingRate, Quote};

/// A single cache entry with expiration.
#[derive(Clone)]
struct CacheEntry<T: Clone> {
    data: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-memory TTL cache keyed by symbol, with independent namespaces for
/// quotes and funding-rate lists.
///
/// The mutex is only ever held across synchronous map operations; no await
/// point can interleave a read-then-write for the same key.
pub struct FeedCache {
    ttl: Duration,
    quotes: Mutex<HashMap<String, CacheEntry<Quote>>>,
    funding: Mutex<HashMap<String, CacheEntry<Vec<FundingRate>>>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            quotes: Mutex::new(HashMap::new()),
            funding: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached quote for `symbol` if it has not expired.
    pub fn get_quote(&self, symbol: &str) -> Option<Quote> {
        let quotes = self.quotes.lock().expect("cache lock poisoned");
        quotes
            .get(symbol)
            .filter(|entry| entry.is_valid())
            .map(|entry| entry.data.clone())
    }

    /// Store a quote, unconditionally replacing any previous entry.
    pub fn put_quote(&self, quote: Quote) {
        let mut quotes = self.quotes.lock().expect("cache lock poisoned");
        quotes.insert(quote.symbol.clone(), CacheEntry::new(quote, self.ttl));
    }

    /// Return the cached funding rates for `symbol` if present, non-empty,
    /// and not expired.
    pub fn get_funding(&self, symbol: &str) -> Option<Vec<FundingRate>> {
        let funding = self.funding.lock().expect("cache lock poisoned");
        funding
            .get(symbol)
            .filter(|entry| entry.is_valid() && !entry.data.is_empty())
            .map(|entry| entry.data.clone())
    }

    /// Store a funding-rate list, unconditionally replacing any previous entry.
    pub fn put_funding(&self, symbol: &str, rates: Vec<FundingRate>) {
        let mut funding = self.funding.lock().expect("cache lock poisoned");
        funding.insert(symbol.to_string(), CacheEntry::new(rates, self.ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::now_ms;

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            timestamp: now_ms(),
            source: "test",
            confidence: 0.95,
        }
    }

    fn rate(symbol: &str) -> FundingRate {
        FundingRate {
            symbol: symbol.to_string(),
            rate: 0.0876,
            timestamp: now_ms(),
            exchange: "test",
            next_funding_time: now_ms() + 3_600_000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_hit_within_ttl() {
        let cache = FeedCache::new(Duration::from_secs(30));
        cache.put_quote(quote("BTC", 65000.5));

        tokio::time::advance(Duration::from_secs(5)).await;
        let hit = cache.get_quote("BTC").expect("should still be cached");
        assert_eq!(hit.price, 65000.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_expires_after_ttl() {
        let cache = FeedCache::new(Duration::from_secs(30));
        cache.put_quote(quote("BTC", 65000.5));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cache.get_quote("BTC").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins() {
        let cache = FeedCache::new(Duration::from_secs(30));
        cache.put_quote(quote("SEI", 0.42));
        cache.put_quote(quote("SEI", 0.44));

        assert_eq!(cache.get_quote("SEI").unwrap().price, 0.44);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_funding_list_is_a_miss() {
        let cache = FeedCache::new(Duration::from_secs(30));
        cache.put_funding("ETH", vec![]);
        assert!(cache.get_funding("ETH").is_none());

        cache.put_funding("ETH", vec![rate("ETH")]);
        assert_eq!(cache.get_funding("ETH").unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_namespaces_are_independent() {
        let cache = FeedCache::new(Duration::from_secs(30));
        cache.put_quote(quote("BTC", 65000.5));
        assert!(cache.get_funding("BTC").is_none());
    }
}
