//! Risk metrics engine
//!
//! Computes the full per-portfolio risk block relative to a benchmark:
//! - Return, variance, volatility, Sharpe
//! - Beta / Alpha (CAPM)
//! - Sortino, Calmar
//! - Historical VaR(95), max drawdown
//! - Tracking error, information ratio
//!
//! Every division is guarded; degenerate input (constant series, single
//! point, missing benchmark) yields safe defaults, never a panic.

pub mod concentration;
pub mod stress;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stats::{
    annualization, annualized_volatility, mean, sample_covariance, sample_variance, sqrt,
    StatisticsSnapshot,
};

/// Full risk metrics block of the risk report.
///
/// All figures are annualized except `var_95_daily`, which is deliberately a
/// daily tail-risk number (the convention of the system this engine serves).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub expected_return: Decimal,
    pub variance: Decimal,
    pub volatility: Decimal,
    pub sharpe_ratio: Decimal,
    pub beta: Decimal,
    pub alpha: Decimal,
    /// `Decimal::MAX` stands in for infinity when no downside periods exist
    pub sortino_ratio: Decimal,
    pub calmar_ratio: Decimal,
    /// Daily figure, not annualized
    pub var_95_daily: Decimal,
    /// Non-negative fraction (0.18 = 18% peak-to-trough)
    pub max_drawdown: Decimal,
    pub tracking_error: Decimal,
    pub information_ratio: Decimal,
}

/// Compute the full metrics block for the given weights.
///
/// `weights` is ordered like `snapshot.symbols`.
pub fn compute_risk_metrics(
    snapshot: &StatisticsSnapshot,
    weights: &[Decimal],
    risk_free_rate: Decimal,
) -> RiskMetrics {
    let expected_return = portfolio_return(snapshot, weights);
    let variance = portfolio_variance(snapshot, weights);
    let volatility = sqrt(variance);

    let sharpe_ratio = if volatility > Decimal::ZERO {
        (expected_return - risk_free_rate) / volatility
    } else {
        Decimal::ZERO
    };

    let portfolio_daily = snapshot.portfolio_returns(weights);
    let benchmark_daily = &snapshot.benchmark_returns;

    let (beta, alpha, tracking_error) = if benchmark_daily.is_empty() {
        (Decimal::ONE, Decimal::ZERO, Decimal::ZERO)
    } else {
        let bench_var = sample_variance(benchmark_daily);
        let beta = if bench_var > Decimal::ZERO {
            sample_covariance(&portfolio_daily, benchmark_daily) / bench_var
        } else {
            Decimal::ONE
        };

        let benchmark_return = mean(benchmark_daily) * annualization();
        let alpha =
            expected_return - risk_free_rate - beta * (benchmark_return - risk_free_rate);

        let diffs: Vec<Decimal> = portfolio_daily
            .iter()
            .zip(benchmark_daily.iter())
            .map(|(p, b)| *p - *b)
            .collect();
        (beta, alpha, annualized_volatility(&diffs))
    };

    let information_ratio = if tracking_error > Decimal::ZERO {
        alpha / tracking_error
    } else {
        Decimal::ZERO
    };

    let max_drawdown = max_drawdown(&portfolio_daily);
    let annualized_mean = mean(&portfolio_daily) * annualization();

    let calmar_ratio = if max_drawdown > Decimal::ZERO {
        annualized_mean / max_drawdown
    } else {
        Decimal::ZERO
    };

    RiskMetrics {
        expected_return,
        variance,
        volatility,
        sharpe_ratio,
        beta,
        alpha,
        sortino_ratio: sortino_ratio(&portfolio_daily, risk_free_rate),
        calmar_ratio,
        var_95_daily: historical_var_95(&portfolio_daily),
        max_drawdown,
        tracking_error,
        information_ratio,
    }
}

/// Annualized portfolio return `Σ wᵢ·μᵢ`
pub fn portfolio_return(snapshot: &StatisticsSnapshot, weights: &[Decimal]) -> Decimal {
    weights
        .iter()
        .zip(snapshot.expected_returns.iter())
        .map(|(w, mu)| *w * *mu)
        .sum()
}

/// Annualized portfolio variance `wᵗΣw`, clamped to non-negative
pub fn portfolio_variance(snapshot: &StatisticsSnapshot, weights: &[Decimal]) -> Decimal {
    let n = snapshot.symbols.len().min(weights.len());
    let mut variance = Decimal::ZERO;
    for i in 0..n {
        for j in 0..n {
            variance += weights[i] * weights[j] * snapshot.covariance[i][j];
        }
    }
    variance.max(Decimal::ZERO)
}

/// Maximum peak-to-trough drawdown of a daily return series.
///
/// Tracks the running peak of the cumulative product `Π(1+r)` and reports the
/// largest `(peak - cum) / peak`, as a non-negative fraction.
pub fn max_drawdown(returns: &[Decimal]) -> Decimal {
    let mut cum = Decimal::ONE;
    let mut peak = Decimal::ONE;
    let mut max_dd = Decimal::ZERO;

    for r in returns {
        cum *= Decimal::ONE + *r;
        if cum > peak {
            peak = cum;
        }
        if peak > Decimal::ZERO {
            let dd = (peak - cum) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// Historical 95% VaR: absolute value of the 5th percentile of the sorted
/// daily return series. A daily figure by convention.
pub fn historical_var_95(returns: &[Decimal]) -> Decimal {
    if returns.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = returns.to_vec();
    sorted.sort();
    let idx = returns.len() * 5 / 100;
    sorted[idx.min(sorted.len() - 1)].abs()
}

/// Sortino ratio over daily returns.
///
/// Downside deviation uses only negative-return periods. With no downside
/// periods the ratio is mathematically infinite; `Decimal::MAX` stands in.
pub fn sortino_ratio(returns: &[Decimal], risk_free_rate: Decimal) -> Decimal {
    let downside: Vec<Decimal> = returns
        .iter()
        .filter(|r| **r < Decimal::ZERO)
        .copied()
        .collect();

    if downside.is_empty() {
        return Decimal::MAX;
    }

    let downside_var = downside.iter().map(|r| *r * *r).sum::<Decimal>()
        / Decimal::from(downside.len() as u64);
    let downside_dev = sqrt(downside_var) * sqrt(annualization());

    if downside_dev == Decimal::ZERO {
        return Decimal::MAX;
    }

    (mean(returns) * annualization() - risk_free_rate) / downside_dev
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Two-asset snapshot: AAPL σ=0.20 μ=0.12, MSFT σ=0.18 μ=0.10, ρ=0.6
    fn two_asset_snapshot() -> StatisticsSnapshot {
        let cov_ab = dec!(0.6) * dec!(0.20) * dec!(0.18);
        StatisticsSnapshot {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            returns: vec![Vec::new(), Vec::new()],
            expected_returns: vec![dec!(0.12), dec!(0.10)],
            covariance: vec![
                vec![dec!(0.04), cov_ab],
                vec![cov_ab, dec!(0.0324)],
            ],
            benchmark_returns: Vec::new(),
        }
    }

    #[test]
    fn test_two_asset_headline_metrics() {
        let snapshot = two_asset_snapshot();
        let weights = vec![dec!(0.6), dec!(0.4)];

        let metrics = compute_risk_metrics(&snapshot, &weights, dec!(0.045));

        assert_eq!(metrics.expected_return, dec!(0.112));
        // 0.36*0.04 + 0.16*0.0324 + 2*0.6*0.4*0.0216
        assert_eq!(metrics.variance, dec!(0.029952));
        assert_eq!(
            metrics.sharpe_ratio,
            (dec!(0.112) - dec!(0.045)) / metrics.volatility
        );
        assert!(metrics.volatility > Decimal::ZERO);
    }

    #[test]
    fn test_zero_volatility_sharpe_is_zero() {
        let snapshot = StatisticsSnapshot {
            symbols: vec!["X".to_string()],
            returns: vec![Vec::new()],
            expected_returns: vec![dec!(0.10)],
            covariance: vec![vec![Decimal::ZERO]],
            benchmark_returns: Vec::new(),
        };

        let metrics = compute_risk_metrics(&snapshot, &[Decimal::ONE], dec!(0.045));

        assert_eq!(metrics.volatility, Decimal::ZERO);
        assert_eq!(metrics.sharpe_ratio, Decimal::ZERO);
    }

    #[test]
    fn test_max_drawdown_running_peak() {
        let returns = vec![dec!(0.1), dec!(-0.5), dec!(0.25)];
        // cum: 1.1, 0.55, 0.6875; peak 1.1 -> dd = 0.55/1.1 = 0.5
        assert_eq!(max_drawdown(&returns), dec!(0.5));
    }

    #[test]
    fn test_max_drawdown_monotone_rise_is_zero() {
        let returns = vec![dec!(0.01), dec!(0.02), dec!(0.005)];
        assert_eq!(max_drawdown(&returns), Decimal::ZERO);
    }

    #[test]
    fn test_historical_var_picks_fifth_percentile() {
        // 20 points: index 20*5/100 = 1, the second-smallest return
        let mut returns = vec![dec!(0.01); 18];
        returns.push(dec!(-0.08));
        returns.push(dec!(-0.05));

        assert_eq!(historical_var_95(&returns), dec!(0.05));
        assert_eq!(historical_var_95(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_sortino_no_downside_is_max() {
        let returns = vec![dec!(0.01), dec!(0.02), dec!(0.0)];
        assert_eq!(sortino_ratio(&returns, dec!(0.045)), Decimal::MAX);
    }

    #[test]
    fn test_sortino_with_downside_finite() {
        let returns = vec![dec!(0.02), dec!(-0.01), dec!(0.015), dec!(-0.02)];
        let sortino = sortino_ratio(&returns, dec!(0.045));
        assert!(sortino < Decimal::MAX);
    }

    #[test]
    fn test_beta_defaults_to_one_on_flat_benchmark() {
        let mut snapshot = two_asset_snapshot();
        snapshot.returns = vec![vec![dec!(0.01); 10], vec![dec!(0.02); 10]];
        snapshot.benchmark_returns = vec![dec!(0.005); 10];

        let metrics = compute_risk_metrics(&snapshot, &[dec!(0.5), dec!(0.5)], dec!(0.045));

        assert_eq!(metrics.beta, Decimal::ONE);
    }

    #[test]
    fn test_tracking_error_zero_when_tracking_benchmark() {
        let mut snapshot = two_asset_snapshot();
        let series = vec![dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.005)];
        snapshot.returns = vec![series.clone(), series.clone()];
        snapshot.benchmark_returns = series;

        let metrics = compute_risk_metrics(&snapshot, &[dec!(0.5), dec!(0.5)], dec!(0.045));

        assert_eq!(metrics.tracking_error, Decimal::ZERO);
        assert_eq!(metrics.information_ratio, Decimal::ZERO);
    }
}
