//! Shared data model for the risk engine
//!
//! Holdings and price points come from the caller and the market data
//! provider; everything else is derived per invocation and serialized into
//! the JSON reports the dashboard API returns.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single portfolio position as supplied by the caller.
///
/// The engine treats holdings as read-only input and never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    /// Market value; derived from `quantity * current_price` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
}

impl Holding {
    /// Market value of the position
    pub fn market_value(&self) -> Decimal {
        self.current_value
            .unwrap_or(self.quantity * self.current_price)
    }

    /// Cost basis of the position
    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.average_cost
    }

    /// Unrealized gain/loss in dollars
    pub fn unrealized_gain(&self) -> Decimal {
        self.market_value() - self.cost_basis()
    }

    /// Unrealized return relative to cost basis, as a fraction
    pub fn unrealized_return(&self) -> Decimal {
        let cost = self.cost_basis();
        if cost > Decimal::ZERO {
            self.unrealized_gain() / cost
        } else {
            Decimal::ZERO
        }
    }
}

/// One daily close from the market data provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Latest quote for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<Decimal>,
    pub as_of: DateTime<Utc>,
}

/// Lookback windows for historical price requests.
///
/// Fetches retry down this ladder when a provider call fails or comes back
/// too short: three years, then one year, then six months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookback {
    ThreeYears,
    OneYear,
    SixMonths,
}

impl Lookback {
    /// Retry ladder, longest window first
    pub const LADDER: [Lookback; 3] = [
        Lookback::ThreeYears,
        Lookback::OneYear,
        Lookback::SixMonths,
    ];

    /// Calendar days covered by the window
    pub fn days(self) -> u32 {
        match self {
            Lookback::ThreeYears => 1095,
            Lookback::OneYear => 365,
            Lookback::SixMonths => 182,
        }
    }

    /// Query-string label understood by the provider
    pub fn label(self) -> &'static str {
        match self {
            Lookback::ThreeYears => "3y",
            Lookback::OneYear => "1y",
            Lookback::SixMonths => "6m",
        }
    }
}

/// Headline portfolio figures, all annualized.
///
/// Total function: degenerate inputs produce zeros, never an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub expected_return: Decimal,
    pub volatility: Decimal,
    pub variance: Decimal,
    pub sharpe_ratio: Decimal,
}

/// Qualitative risk classification used across the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Moderate => write!(f, "Moderate"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// How the statistics behind a report were obtained.
///
/// `Real` means full historical series backed every figure; `Simplified`
/// means cost-basis proxies with a flat correlation stood in for missing
/// history; `Mock` means the portfolio was too small to analyze at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Real,
    Simplified,
    Mock,
}

/// Provenance block attached to every report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub data_quality: DataQuality,
    /// Symbols the caller asked about
    pub symbols_requested: usize,
    /// Symbols that had usable history
    pub symbols_analyzed: usize,
    pub benchmark: String,
    pub generated_at: DateTime<Utc>,
}
