//! HTTP market data client
//!
//! Talks to the dashboard's market-data service: daily close history and
//! latest quotes as plain JSON.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::types::{Lookback, PricePoint, Quote};

use super::MarketDataProvider;

/// Market data client
#[derive(Clone)]
pub struct HistoryClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoryRow {
    date: NaiveDate,
    close: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
struct QuoteRow {
    symbol: String,
    price: Decimal,
    #[serde(rename = "changePercent")]
    change_percent: Option<Decimal>,
}

impl HistoryClient {
    /// Create a new client against the configured base URL
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for HistoryClient {
    async fn historical_prices(
        &self,
        symbol: &str,
        lookback: Lookback,
    ) -> Result<Vec<PricePoint>> {
        let url = format!("{}/api/history", self.base_url);
        let rows: Vec<HistoryRow> = self
            .http
            .get(&url)
            .query(&[("symbol", symbol), ("range", lookback.label())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(symbol, lookback = lookback.label(), rows = rows.len(), "fetched history");

        let mut prices: Vec<PricePoint> = rows
            .into_iter()
            .map(|row| PricePoint {
                date: row.date,
                close: row.close,
            })
            .collect();

        // The provider is expected to return ascending data; enforce it
        // rather than trust it
        prices.sort_by(|a, b| a.date.cmp(&b.date));

        Ok(prices)
    }

    async fn current_quote(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/api/quote", self.base_url);
        let row: QuoteRow = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Quote {
            symbol: row.symbol,
            price: row.price,
            change_percent: row.change_percent,
            as_of: Utc::now(),
        })
    }
}
