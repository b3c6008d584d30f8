//! Market data boundary
//!
//! The engine consumes an external market-data provider through the
//! [`MarketDataProvider`] trait. [`PriceFetcher`] coordinates the actual
//! fetching: symbols go out in small batches with a pause in between to
//! respect provider rate limits, each symbol retries down a shrinking
//! lookback ladder, and results are memoized in a TTL-bounded cache scoped
//! to the engine instance. A symbol that exhausts the ladder is dropped from
//! the statistics set, never fatal.

pub mod http;

pub use http::HistoryClient;

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::Result;
use crate::types::{Lookback, PricePoint, Quote};

/// External price-history and quote source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Ordered daily closes for a symbol over the lookback window
    async fn historical_prices(
        &self,
        symbol: &str,
        lookback: Lookback,
    ) -> Result<Vec<PricePoint>>;

    /// Latest quote for a symbol
    async fn current_quote(&self, symbol: &str) -> Result<Quote>;
}

/// TTL-bounded history cache.
///
/// Injected into the fetcher rather than living as module state; reads are
/// copy-on-read so concurrent invocations each observe a consistent snapshot.
pub struct HistoryCache {
    entries: Mutex<HashMap<String, (Instant, Vec<PricePoint>)>>,
    ttl: Duration,
}

impl HistoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<Vec<PricePoint>> {
        let mut entries = self.entries.lock();
        match entries.get(symbol) {
            Some((inserted, prices)) if inserted.elapsed() < self.ttl => {
                Some(prices.clone())
            }
            Some(_) => {
                entries.remove(symbol);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, symbol: &str, prices: Vec<PricePoint>) {
        self.entries
            .lock()
            .insert(symbol.to_string(), (Instant::now(), prices));
    }
}

/// Batched, retrying, memoizing fetch coordinator over a provider
pub struct PriceFetcher<P> {
    provider: P,
    cache: HistoryCache,
    batch_size: usize,
    batch_delay: Duration,
}

impl<P: MarketDataProvider> PriceFetcher<P> {
    pub fn new(provider: P, config: &FetchConfig) -> Self {
        Self {
            provider,
            cache: HistoryCache::new(Duration::from_secs(config.cache_ttl_secs)),
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch history for every symbol, in rate-limit-friendly batches.
    ///
    /// Symbols that fail across the whole lookback ladder are absent from the
    /// result map.
    pub async fn fetch_all(&self, symbols: &[String]) -> BTreeMap<String, Vec<PricePoint>> {
        let mut unique: Vec<&String> = symbols.iter().collect();
        unique.sort();
        unique.dedup();

        let mut results = BTreeMap::new();
        let batches: Vec<&[&String]> = unique.chunks(self.batch_size).collect();
        let batch_count = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            let fetches = batch.iter().map(|symbol| self.fetch_symbol(symbol));
            for (symbol, prices) in batch.iter().zip(join_all(fetches).await) {
                if let Some(prices) = prices {
                    results.insert((*symbol).clone(), prices);
                }
            }

            if i + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        debug!(
            requested = unique.len(),
            fetched = results.len(),
            "historical price fetch complete"
        );
        results
    }

    /// Fetch one symbol, walking the lookback ladder on failure or empty data
    async fn fetch_symbol(&self, symbol: &str) -> Option<Vec<PricePoint>> {
        if let Some(cached) = self.cache.get(symbol) {
            return Some(cached);
        }

        for lookback in Lookback::LADDER {
            match self.provider.historical_prices(symbol, lookback).await {
                Ok(prices) if !prices.is_empty() => {
                    self.cache.insert(symbol, prices.clone());
                    return Some(prices);
                }
                Ok(_) => {
                    debug!(symbol, lookback = lookback.label(), "empty history, retrying");
                }
                Err(e) => {
                    warn!(symbol, lookback = lookback.label(), error = %e, "history fetch failed");
                }
            }
        }

        warn!(symbol, "no usable history after all lookbacks, dropping symbol");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    fn points(len: usize) -> Vec<PricePoint> {
        (0..len)
            .map(|i| PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .checked_add_days(chrono::Days::new(i as u64))
                    .unwrap(),
                close: dec!(100) + Decimal::from(i as u64),
            })
            .collect()
    }

    use rust_decimal::Decimal;

    fn fetch_config() -> FetchConfig {
        FetchConfig {
            batch_size: 2,
            batch_delay_ms: 0,
            cache_ttl_secs: 300,
        }
    }

    #[tokio::test]
    async fn test_fetch_all_happy_path() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_historical_prices()
            .with(eq("AAPL"), eq(Lookback::ThreeYears))
            .times(1)
            .returning(|_, _| Ok(points(30)));

        let fetcher = PriceFetcher::new(provider, &fetch_config());
        let result = fetcher.fetch_all(&["AAPL".to_string()]).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result["AAPL"].len(), 30);
    }

    #[tokio::test]
    async fn test_retry_ladder_on_failure() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_historical_prices()
            .with(eq("TSLA"), eq(Lookback::ThreeYears))
            .times(1)
            .returning(|_, _| Err(crate::error::EngineError::Provider("rate limited".into())));
        provider
            .expect_historical_prices()
            .with(eq("TSLA"), eq(Lookback::OneYear))
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        provider
            .expect_historical_prices()
            .with(eq("TSLA"), eq(Lookback::SixMonths))
            .times(1)
            .returning(|_, _| Ok(points(25)));

        let fetcher = PriceFetcher::new(provider, &fetch_config());
        let result = fetcher.fetch_all(&["TSLA".to_string()]).await;

        assert_eq!(result["TSLA"].len(), 25);
    }

    #[tokio::test]
    async fn test_symbol_dropped_after_ladder_exhausted() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_historical_prices()
            .times(3)
            .returning(|_, _| Err(crate::error::EngineError::Provider("down".into())));

        let fetcher = PriceFetcher::new(provider, &fetch_config());
        let result = fetcher.fetch_all(&["DEAD".to_string()]).await;

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_cache_avoids_second_fetch() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_historical_prices()
            .times(1)
            .returning(|_, _| Ok(points(30)));

        let fetcher = PriceFetcher::new(provider, &fetch_config());
        let symbols = vec!["NVDA".to_string()];

        let first = fetcher.fetch_all(&symbols).await;
        let second = fetcher.fetch_all(&symbols).await;

        assert_eq!(first["NVDA"], second["NVDA"]);
    }

    #[tokio::test]
    async fn test_duplicate_symbols_fetched_once() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_historical_prices()
            .times(1)
            .returning(|_, _| Ok(points(30)));

        let fetcher = PriceFetcher::new(provider, &fetch_config());
        let result = fetcher
            .fetch_all(&["AMD".to_string(), "AMD".to_string()])
            .await;

        assert_eq!(result.len(), 1);
    }
}
