//! Optimization engine
//!
//! Weight solvers under per-asset box constraints:
//! - Max-Sharpe: bounded gradient-ascent heuristic with a fixed iteration
//!   budget (deterministic, no convergence check)
//! - Min-Risk: inverse-variance weighting
//! - Target-Return: return-proportional weights blended toward the min-risk
//!   anchor to meet the requested target
//!
//! Plus an efficient-frontier sweep and the proxy statistics used when
//! historical data is too thin for real estimation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::stats::{sqrt, StatisticsSnapshot};
use crate::types::{Holding, PortfolioMetrics};

/// Solver objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    MaxSharpe,
    MinRisk,
    TargetReturn,
}

impl Default for OptimizationType {
    fn default() -> Self {
        OptimizationType::MaxSharpe
    }
}

impl std::fmt::Display for OptimizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizationType::MaxSharpe => write!(f, "max_sharpe"),
            OptimizationType::MinRisk => write!(f, "min_risk"),
            OptimizationType::TargetReturn => write!(f, "target_return"),
        }
    }
}

/// Caller-overridable solver constraints.
///
/// `min_weight = 0` forbids short positions; the defaults cap any single
/// asset at 40% and one-way turnover at 20%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConstraints {
    #[serde(default = "default_min_weight")]
    pub min_weight: Decimal,
    #[serde(default = "default_max_weight")]
    pub max_weight: Decimal,
    #[serde(default = "default_max_turnover")]
    pub max_turnover: Decimal,
    #[serde(default)]
    pub target_risk: Option<Decimal>,
    #[serde(default)]
    pub target_return: Option<Decimal>,
}

fn default_min_weight() -> Decimal {
    Decimal::ZERO
}

fn default_max_weight() -> Decimal {
    dec!(0.4)
}

fn default_max_turnover() -> Decimal {
    dec!(0.2)
}

impl Default for OptimizationConstraints {
    fn default() -> Self {
        Self {
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            max_turnover: default_max_turnover(),
            target_risk: None,
            target_return: None,
        }
    }
}

/// One point on the efficient frontier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub target_return: Decimal,
    pub metrics: PortfolioMetrics,
}

/// Weight solver over one statistics snapshot.
///
/// Holds expected returns and the covariance matrix in symbol order; every
/// solver returns weights in the same order, clipped to the box and
/// renormalized to sum to one.
#[derive(Debug, Clone)]
pub struct WeightSolver {
    symbols: Vec<String>,
    expected_returns: Vec<Decimal>,
    covariance: Vec<Vec<Decimal>>,
    risk_free_rate: Decimal,
    constraints: OptimizationConstraints,
    iterations: usize,
    learning_rate: Decimal,
}

impl WeightSolver {
    /// Create a solver from pre-computed statistics
    pub fn from_statistics(
        symbols: Vec<String>,
        expected_returns: Vec<Decimal>,
        covariance: Vec<Vec<Decimal>>,
        risk_free_rate: Decimal,
    ) -> Self {
        Self {
            symbols,
            expected_returns,
            covariance,
            risk_free_rate,
            constraints: OptimizationConstraints::default(),
            iterations: 50,
            learning_rate: dec!(0.1),
        }
    }

    /// Create a solver from a statistics snapshot
    pub fn from_snapshot(snapshot: &StatisticsSnapshot, risk_free_rate: Decimal) -> Self {
        Self::from_statistics(
            snapshot.symbols.clone(),
            snapshot.expected_returns.clone(),
            snapshot.covariance.clone(),
            risk_free_rate,
        )
    }

    /// Create a solver from cost-basis proxy statistics (simplified mode)
    pub fn from_proxies(holdings: &[Holding], risk_free_rate: Decimal) -> Self {
        let (symbols, expected_returns, covariance) = proxy_statistics(holdings);
        Self::from_statistics(symbols, expected_returns, covariance, risk_free_rate)
    }

    /// Set solver constraints
    pub fn with_constraints(mut self, constraints: OptimizationConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Set the ascent iteration budget and learning rate
    pub fn with_tuning(mut self, iterations: usize, learning_rate: Decimal) -> Self {
        self.iterations = iterations;
        self.learning_rate = learning_rate;
        self
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn constraints(&self) -> &OptimizationConstraints {
        &self.constraints
    }

    /// Solve for the requested objective.
    ///
    /// Target-return without an explicit target aims at the mean of the
    /// expected returns.
    pub fn solve(&self, objective: OptimizationType) -> Vec<Decimal> {
        if self.symbols.is_empty() {
            return Vec::new();
        }

        let weights = match objective {
            OptimizationType::MaxSharpe => self.max_sharpe(),
            OptimizationType::MinRisk => self.min_risk(),
            OptimizationType::TargetReturn => {
                let target = self.constraints.target_return.unwrap_or_else(|| {
                    self.expected_returns.iter().sum::<Decimal>()
                        / Decimal::from(self.expected_returns.len() as u64)
                });
                self.target_return(target)
            }
        };

        debug!(objective = %objective, assets = self.symbols.len(), "solved weights");
        weights
    }

    /// Bounded gradient-ascent toward maximum Sharpe.
    ///
    /// Fixed iteration budget, no convergence check: per-asset gradient proxy
    /// `(μᵢ - rf) / σ_p`, normalized by the sum of absolute gradients, nudges
    /// each weight by the learning rate, then clip and renormalize.
    fn max_sharpe(&self) -> Vec<Decimal> {
        let n = self.symbols.len();
        let mut weights = vec![Decimal::ONE / Decimal::from(n as u64); n];

        for _ in 0..self.iterations {
            let vol = self.portfolio_volatility(&weights);
            let vol = if vol > Decimal::ZERO { vol } else { Decimal::ONE };

            let mut gradients: Vec<Decimal> = self
                .expected_returns
                .iter()
                .map(|mu| (*mu - self.risk_free_rate) / vol)
                .collect();

            let total: Decimal = gradients.iter().map(|g| g.abs()).sum();
            if total > Decimal::ZERO {
                for g in &mut gradients {
                    *g /= total;
                }
            }

            for i in 0..n {
                weights[i] += gradients[i] * self.learning_rate;
            }

            self.apply_constraints(&mut weights);
        }

        weights
    }

    /// Inverse-variance weighting
    fn min_risk(&self) -> Vec<Decimal> {
        let mut weights: Vec<Decimal> = (0..self.symbols.len())
            .map(|i| {
                let var = self.covariance[i][i];
                if var > Decimal::ZERO {
                    Decimal::ONE / var
                } else {
                    Decimal::ONE
                }
            })
            .collect();

        self.apply_constraints(&mut weights);
        weights
    }

    /// Return-proportional weights steered toward a target return.
    ///
    /// The base allocation is proportional to `max(μᵢ, 0)` (equal weights
    /// when every expected return is non-positive, in which case the target
    /// is unreachable and ignored). The base is then blended toward the
    /// min-risk anchor so the portfolio return lands on the target when it
    /// lies between the two; targets outside that range clamp to the nearer
    /// end.
    fn target_return(&self, target: Decimal) -> Vec<Decimal> {
        let n = self.symbols.len();

        let positive_total: Decimal = self
            .expected_returns
            .iter()
            .map(|mu| (*mu).max(Decimal::ZERO))
            .sum();

        if positive_total <= Decimal::ZERO {
            let mut weights = vec![Decimal::ONE / Decimal::from(n as u64); n];
            self.apply_constraints(&mut weights);
            return weights;
        }

        let mut base: Vec<Decimal> = self
            .expected_returns
            .iter()
            .map(|mu| (*mu).max(Decimal::ZERO) / positive_total)
            .collect();
        self.apply_constraints(&mut base);

        let anchor = self.min_risk();

        let base_return = self.expected_return_of(&base);
        let anchor_return = self.expected_return_of(&anchor);
        let span = base_return - anchor_return;

        let lambda = if span.abs() > dec!(0.000001) {
            ((target - anchor_return) / span)
                .max(Decimal::ZERO)
                .min(Decimal::ONE)
        } else {
            Decimal::ONE
        };

        let mut weights: Vec<Decimal> = (0..n)
            .map(|i| lambda * base[i] + (Decimal::ONE - lambda) * anchor[i])
            .collect();
        self.apply_constraints(&mut weights);
        weights
    }

    /// Sweep target returns across `[min μ, max μ]` and collect the solved
    /// portfolios, sorted ascending by volatility.
    pub fn efficient_frontier(&self, points: usize) -> Vec<FrontierPoint> {
        if self.symbols.is_empty() || points == 0 {
            return Vec::new();
        }

        let lo = *self
            .expected_returns
            .iter()
            .min()
            .unwrap_or(&Decimal::ZERO);
        let hi = *self
            .expected_returns
            .iter()
            .max()
            .unwrap_or(&Decimal::ZERO);

        let steps = points.max(2) - 1;
        let step = (hi - lo) / Decimal::from(steps as u64);

        let mut frontier: Vec<FrontierPoint> = (0..points)
            .map(|i| {
                let target = lo + step * Decimal::from(i as u64);
                let weights = self.target_return(target);
                FrontierPoint {
                    target_return: target,
                    metrics: self.metrics_for(&weights),
                }
            })
            .filter(|p| p.metrics.volatility >= Decimal::ZERO)
            .collect();

        frontier.sort_by(|a, b| a.metrics.volatility.cmp(&b.metrics.volatility));
        frontier
    }

    /// Headline metrics for an arbitrary weight vector
    pub fn metrics_for(&self, weights: &[Decimal]) -> PortfolioMetrics {
        let expected_return: Decimal = weights
            .iter()
            .zip(self.expected_returns.iter())
            .map(|(w, mu)| *w * *mu)
            .sum();

        let variance = self.portfolio_variance(weights);
        let volatility = sqrt(variance);
        let sharpe_ratio = if volatility > Decimal::ZERO {
            (expected_return - self.risk_free_rate) / volatility
        } else {
            Decimal::ZERO
        };

        PortfolioMetrics {
            expected_return,
            volatility,
            variance,
            sharpe_ratio,
        }
    }

    /// Weight vector keyed by symbol, as it appears in reports
    pub fn weight_map(&self, weights: &[Decimal]) -> BTreeMap<String, Decimal> {
        self.symbols
            .iter()
            .cloned()
            .zip(weights.iter().copied())
            .collect()
    }

    fn expected_return_of(&self, weights: &[Decimal]) -> Decimal {
        weights
            .iter()
            .zip(self.expected_returns.iter())
            .map(|(w, mu)| *w * *mu)
            .sum()
    }

    fn portfolio_variance(&self, weights: &[Decimal]) -> Decimal {
        let n = weights.len().min(self.symbols.len());
        let mut variance = Decimal::ZERO;
        for i in 0..n {
            for j in 0..n {
                variance += weights[i] * weights[j] * self.covariance[i][j];
            }
        }
        variance.max(Decimal::ZERO)
    }

    fn portfolio_volatility(&self, weights: &[Decimal]) -> Decimal {
        sqrt(self.portfolio_variance(weights))
    }

    /// Clip weights to the box and renormalize to sum to one.
    ///
    /// Runs the clip/renormalize cycle to a fixed point: renormalizing can
    /// push weights back over the cap, so the cycle repeats until the summed
    /// clipped weights are already one. When the box itself is infeasible
    /// (n × max_weight < 1) the sum-to-one invariant wins.
    fn apply_constraints(&self, weights: &mut Vec<Decimal>) {
        let n = weights.len();
        if n == 0 {
            return;
        }
        let tolerance = dec!(0.000001);

        for _ in 0..20 {
            for w in weights.iter_mut() {
                *w = (*w).max(self.constraints.min_weight);
                *w = (*w).min(self.constraints.max_weight);
            }

            let sum: Decimal = weights.iter().sum();
            if sum <= Decimal::ZERO {
                let equal = Decimal::ONE / Decimal::from(n as u64);
                for w in weights.iter_mut() {
                    *w = equal;
                }
                return;
            }

            if (sum - Decimal::ONE).abs() <= tolerance {
                return;
            }

            for w in weights.iter_mut() {
                *w /= sum;
            }
        }
    }
}

/// Cost-basis proxy statistics for the degraded-data path.
///
/// Each holding's proxy expected return is its unrealized return against
/// cost basis; proxy volatility is the magnitude of that same figure
/// (floored at 15% so inverse-variance weighting stays defined), and all
/// pairs share a flat 0.3 correlation.
pub fn proxy_statistics(
    holdings: &[Holding],
) -> (Vec<String>, Vec<Decimal>, Vec<Vec<Decimal>>) {
    let flat_correlation = dec!(0.3);
    let vol_floor = dec!(0.15);

    let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
    let expected_returns: Vec<Decimal> =
        holdings.iter().map(|h| h.unrealized_return()).collect();
    let vols: Vec<Decimal> = expected_returns
        .iter()
        .map(|mu| {
            let v = mu.abs();
            if v > Decimal::ZERO {
                v
            } else {
                vol_floor
            }
        })
        .collect();

    let n = symbols.len();
    let mut covariance = vec![vec![Decimal::ZERO; n]; n];
    for i in 0..n {
        for j in 0..n {
            covariance[i][j] = if i == j {
                vols[i] * vols[i]
            } else {
                flat_correlation * vols[i] * vols[j]
            };
        }
    }

    (symbols, expected_returns, covariance)
}

/// Cap one-way turnover by blending the optimal weights toward the current
/// ones. Both vectors share one symbol order; the blend keeps the sum-to-one
/// invariant (and the box, whenever the current weights respect it).
pub fn apply_turnover_cap(
    current: &[Decimal],
    optimal: &[Decimal],
    max_turnover: Decimal,
) -> Vec<Decimal> {
    let turnover: Decimal = current
        .iter()
        .zip(optimal.iter())
        .map(|(c, o)| (*o - *c).abs())
        .sum::<Decimal>()
        / dec!(2);

    if turnover <= max_turnover || turnover == Decimal::ZERO {
        return optimal.to_vec();
    }

    let factor = max_turnover / turnover;
    current
        .iter()
        .zip(optimal.iter())
        .map(|(c, o)| *c + (*o - *c) * factor)
        .collect()
}
