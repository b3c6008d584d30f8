//! Returns & statistics engine
//!
//! Turns raw price series into the one statistics snapshot the rest of the
//! engine works from: daily return series, annualized expected returns, and
//! an annualized sample covariance matrix. Symbols without usable history
//! are dropped from the snapshot, never fatal.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, MathematicalOps};

use crate::types::PricePoint;

/// Trading days per year used for annualization
pub const TRADING_DAYS: u32 = 252;

/// Minimum price points for a series to be statistically usable
pub const MIN_HISTORY_POINTS: usize = 20;

/// Square root clamped to zero for non-positive input.
///
/// Covariance arithmetic can produce tiny negative variances; those must
/// never turn into NaN-like states downstream.
pub(crate) fn sqrt(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    x.sqrt().unwrap_or(Decimal::ZERO)
}

pub(crate) fn annualization() -> Decimal {
    Decimal::from(TRADING_DAYS)
}

/// Daily simple returns from a close series.
///
/// Element `i` is `(p[i] - p[i-1]) / p[i-1]`, computed only when the previous
/// close is positive; otherwise 0. Output length is `prices.len() - 1`.
pub fn daily_returns(prices: &[PricePoint]) -> Vec<Decimal> {
    prices
        .windows(2)
        .map(|w| {
            if w[0].close > Decimal::ZERO {
                (w[1].close - w[0].close) / w[0].close
            } else {
                Decimal::ZERO
            }
        })
        .collect()
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len() as u64)
}

/// Sample covariance with an n-1 denominator; 0 when fewer than 2 pairs
pub fn sample_covariance(a: &[Decimal], b: &[Decimal]) -> Decimal {
    let n = a.len().min(b.len());
    if n < 2 {
        return Decimal::ZERO;
    }
    let mean_a = mean(&a[..n]);
    let mean_b = mean(&b[..n]);

    let mut acc = Decimal::ZERO;
    for i in 0..n {
        acc += (a[i] - mean_a) * (b[i] - mean_b);
    }
    acc / Decimal::from((n - 1) as u64)
}

/// Sample variance (n-1 denominator)
pub fn sample_variance(values: &[Decimal]) -> Decimal {
    sample_covariance(values, values)
}

/// Annualized volatility of a daily return series
pub fn annualized_volatility(returns: &[Decimal]) -> Decimal {
    sqrt(sample_variance(returns)) * sqrt(annualization())
}

/// The shared in-memory statistics snapshot for one engine invocation.
///
/// `covariance[i][j]` is annualized and symmetric by construction: each
/// unordered pair is computed once and mirrored.
#[derive(Debug, Clone)]
pub struct StatisticsSnapshot {
    /// Symbols with usable history, in input order
    pub symbols: Vec<String>,
    /// Daily return series per symbol, all trimmed to one common length
    pub returns: Vec<Vec<Decimal>>,
    /// Annualized expected return per symbol
    pub expected_returns: Vec<Decimal>,
    /// Annualized covariance matrix
    pub covariance: Vec<Vec<Decimal>>,
    /// Benchmark daily returns, trimmed to the same common length
    pub benchmark_returns: Vec<Decimal>,
}

impl StatisticsSnapshot {
    /// Build the snapshot from per-symbol price series plus the benchmark.
    ///
    /// Series shorter than [`MIN_HISTORY_POINTS`] are dropped. All remaining
    /// series (benchmark included, when usable) are trimmed to the shortest
    /// common length, keeping the most recent points, before pairing.
    pub fn compute(
        series: &BTreeMap<String, Vec<PricePoint>>,
        benchmark: &[PricePoint],
    ) -> Self {
        let usable: Vec<(&String, &Vec<PricePoint>)> = series
            .iter()
            .filter(|(_, prices)| prices.len() >= MIN_HISTORY_POINTS)
            .collect();

        if usable.is_empty() {
            return Self::empty();
        }

        let mut common_len = usable
            .iter()
            .map(|(_, prices)| prices.len())
            .min()
            .unwrap_or(0);

        let benchmark_usable = benchmark.len() >= MIN_HISTORY_POINTS;
        if benchmark_usable {
            common_len = common_len.min(benchmark.len());
        }

        let symbols: Vec<String> = usable.iter().map(|(s, _)| (*s).clone()).collect();
        let returns: Vec<Vec<Decimal>> = usable
            .iter()
            .map(|(_, prices)| daily_returns(&prices[prices.len() - common_len..]))
            .collect();

        let ann = annualization();
        let expected_returns: Vec<Decimal> =
            returns.iter().map(|r| mean(r) * ann).collect();

        let n = symbols.len();
        let mut covariance = vec![vec![Decimal::ZERO; n]; n];
        for i in 0..n {
            for j in i..n {
                let cov = sample_covariance(&returns[i], &returns[j]) * ann;
                covariance[i][j] = cov;
                covariance[j][i] = cov;
            }
        }

        let benchmark_returns = if benchmark_usable {
            daily_returns(&benchmark[benchmark.len() - common_len..])
        } else {
            Vec::new()
        };

        Self {
            symbols,
            returns,
            expected_returns,
            covariance,
            benchmark_returns,
        }
    }

    pub fn empty() -> Self {
        Self {
            symbols: Vec::new(),
            returns: Vec::new(),
            expected_returns: Vec::new(),
            covariance: Vec::new(),
            benchmark_returns: Vec::new(),
        }
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Annualized volatility of one asset
    pub fn asset_volatility(&self, idx: usize) -> Decimal {
        sqrt(self.covariance[idx][idx])
    }

    /// Daily portfolio return series under the given weights (same order as
    /// `symbols`)
    pub fn portfolio_returns(&self, weights: &[Decimal]) -> Vec<Decimal> {
        let len = self.returns.first().map(|r| r.len()).unwrap_or(0);
        let mut series = vec![Decimal::ZERO; len];
        for (i, asset_returns) in self.returns.iter().enumerate() {
            let w = weights.get(i).copied().unwrap_or(Decimal::ZERO);
            for (t, r) in asset_returns.iter().enumerate() {
                series[t] += w * *r;
            }
        }
        series
    }
}
