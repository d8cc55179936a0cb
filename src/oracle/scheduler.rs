//! Refresh scheduler - periodic background cache warming
//!
//! A cancellable repeating task that resolves prices and funding rates for
//! a fixed watch-list so that user-facing requests are usually served from
//! cache instead of paying full origin latency.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::oracle::funding::FundingRateAggregator;
use crate::oracle::resolver::PriceResolver;

pub struct RefreshScheduler {
    resolver: Arc<PriceResolver>,
    funding: Arc<FundingRateAggregator>,
    watchlist: Vec<String>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(
        resolver: Arc<PriceResolver>,
        funding: Arc<FundingRateAggregator>,
        watchlist: Vec<String>,
        period: Duration,
    ) -> Self {
        Self {
            resolver,
            funding,
            watchlist,
            period,
            task: Mutex::new(None),
        }
    }

    /// Start the periodic refresh task. Calling start on a running
    /// scheduler is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock().expect("scheduler lock poisoned");
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::debug!("refresh scheduler already running");
            return;
        }

        let resolver = self.resolver.clone();
        let funding = self.funding.clone();
        let watchlist = self.watchlist.clone();
        let period = self.period;

        tracing::info!(
            period_secs = period.as_secs(),
            watchlist = ?watchlist,
            "starting periodic refresh"
        );

        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                for symbol in &watchlist {
                    // Results are discarded; the point is the cache write-back.
                    let _ = resolver.get_price(symbol).await;
                    let _ = funding.get_funding_rates(symbol).await;
                }
                tracing::debug!(symbols = watchlist.len(), "refresh tick complete");
            }
        }));
    }

    /// Stop the refresh task. No ticks run after this returns; a tick
    /// already in flight is not interrupted mid-symbol by design of
    /// `JoinHandle::abort` only taking effect at await points.
    pub fn stop(&self) {
        let mut task = self.task.lock().expect("scheduler lock poisoned");
        if let Some(handle) = task.take() {
            handle.abort();
            tracing::info!("periodic refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .expect("scheduler lock poisoned")
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::cache::FeedCache;
    use crate::oracle::sources::MockQuoteSource;
    use crate::types::{now_ms, Quote};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scheduler wired to a single counting source and no funding exchanges.
    fn scheduler_with_counter(period: Duration) -> (RefreshScheduler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut source = MockQuoteSource::new();
        source.expect_name().return_const("oracle-hub");
        source.expect_fetch_quote().returning(move |s| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Quote {
                symbol: s.to_string(),
                price: 0.42,
                timestamp: now_ms(),
                source: "oracle-hub",
                confidence: 0.98,
            })
        });

        let cache = Arc::new(FeedCache::new(period));
        let resolver = Arc::new(PriceResolver::new(vec![Box::new(source)], cache.clone()));
        let funding = Arc::new(FundingRateAggregator::new(vec![], cache));
        let scheduler = RefreshScheduler::new(resolver, funding, vec!["SEI".to_string()], period);
        (scheduler, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_populate_the_cache() {
        let (scheduler, calls) = scheduler_with_counter(Duration::from_secs(30));
        scheduler.start();

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Cache expires exactly at the next tick, so each period refetches.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (scheduler, calls) = scheduler_with_counter(Duration::from_secs(30));
        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        // A second task would have doubled the call count.
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let (scheduler, calls) = scheduler_with_counter(Duration::from_secs(30));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let before = calls.load(Ordering::SeqCst);
        assert!(before >= 1);

        scheduler.stop();
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_can_be_restarted_after_stop() {
        let (scheduler, calls) = scheduler_with_counter(Duration::from_secs(30));
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop();

        let before = calls.load(Ordering::SeqCst);
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(calls.load(Ordering::SeqCst) > before);

        scheduler.stop();
    }
}
