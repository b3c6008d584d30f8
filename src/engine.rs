//! Portfolio risk engine facade
//!
//! Ties the pipeline together for one invocation: fetch history → build the
//! statistics snapshot → run risk metrics, concentration, stress tests and
//! the optimizers against it. Always returns a fully-shaped report; callers
//! distinguish statistically-grounded from proxy results through
//! `metadata.data_quality`. The only raising paths are programmer errors
//! (malformed holdings).

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{MarketDataProvider, PriceFetcher};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::optimizer::{
    apply_turnover_cap, proxy_statistics, FrontierPoint, OptimizationConstraints,
    OptimizationType, WeightSolver,
};
use crate::rebalance::{rebalancing_trades, risk_budget, RiskBudgetEntry, TradeRecommendation};
use crate::risk::concentration::{analyze_concentration, correlation_map, ConcentrationAnalysis};
use crate::risk::stress::{run_stress_tests, StressResult};
use crate::risk::{compute_risk_metrics, RiskMetrics};
use crate::stats::StatisticsSnapshot;
use crate::types::{
    DataQuality, Holding, PortfolioMetrics, Quote, ReportMetadata, RiskLevel,
};

/// Gain/loss line for one holding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingPerformance {
    pub symbol: String,
    /// Unrealized return vs. cost basis, 0-100 scale
    pub return_percent: Decimal,
    pub gain: Decimal,
    pub weight_percent: Decimal,
}

/// Cost-basis performance block of the risk report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_value: Decimal,
    pub total_cost_basis: Decimal,
    pub total_unrealized_gain: Decimal,
    pub total_return_percent: Decimal,
    pub top_performers: Vec<HoldingPerformance>,
    pub worst_performers: Vec<HoldingPerformance>,
}

/// The aggregate risk report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub metrics: RiskMetrics,
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, Decimal>>,
    pub concentration: ConcentrationAnalysis,
    pub stress_tests: Vec<StressResult>,
    pub performance: PerformanceSummary,
    pub insights: Vec<String>,
    pub metadata: ReportMetadata,
}

/// Optimization request: objective plus caller-overridable constraints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationRequest {
    #[serde(default = "default_objective")]
    pub objective: OptimizationType,
    #[serde(default)]
    pub constraints: OptimizationConstraints,
}

fn default_objective() -> OptimizationType {
    OptimizationType::MaxSharpe
}

/// The aggregate optimization report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub objective: OptimizationType,
    pub weights: BTreeMap<String, Decimal>,
    pub current_weights: BTreeMap<String, Decimal>,
    pub metrics: PortfolioMetrics,
    pub rebalancing: Vec<TradeRecommendation>,
    pub risk_budget: Vec<RiskBudgetEntry>,
    pub efficient_frontier: Vec<FrontierPoint>,
    pub metadata: ReportMetadata,
}

/// The portfolio risk & optimization engine.
///
/// Stateless across invocations apart from the TTL-bounded history cache
/// inside the fetcher; each call observes one consistent statistics snapshot.
pub struct RiskEngine<P> {
    fetcher: PriceFetcher<P>,
    config: EngineConfig,
}

impl<P: MarketDataProvider> RiskEngine<P> {
    pub fn new(provider: P, config: EngineConfig) -> Self {
        let fetcher = PriceFetcher::new(provider, &config.fetch);
        Self { fetcher, config }
    }

    /// Latest quote for a symbol, straight from the provider
    pub async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        self.fetcher.provider().current_quote(symbol).await
    }

    /// Full risk report for the given holdings
    pub async fn calculate_portfolio_risk(&self, holdings: &[Holding]) -> Result<RiskReport> {
        validate_holdings(holdings)?;

        if holdings.len() < 2 {
            info!("fewer than 2 holdings, returning mock risk report");
            return Ok(self.mock_risk_report(holdings));
        }

        let (snapshot, data_quality) = self.build_snapshot(holdings).await;
        let weights = current_weights(holdings, &snapshot.symbols);

        let metrics = compute_risk_metrics(
            &snapshot,
            &weights,
            self.config.engine.risk_free_rate,
        );
        let concentration = analyze_concentration(holdings);
        let stress_tests = run_stress_tests(&weights);
        let performance = performance_summary(holdings);
        let insights = generate_insights(&metrics, &concentration, &stress_tests);

        Ok(RiskReport {
            metrics,
            correlation_matrix: correlation_map(&snapshot),
            concentration,
            stress_tests,
            performance,
            insights,
            metadata: self.metadata(data_quality, holdings.len(), snapshot.symbols.len()),
        })
    }

    /// Optimized target allocation plus the trades to reach it
    pub async fn optimize_portfolio(
        &self,
        holdings: &[Holding],
        request: OptimizationRequest,
    ) -> Result<OptimizationReport> {
        validate_holdings(holdings)?;

        if holdings.len() < 2 {
            info!("fewer than 2 holdings, returning mock optimization report");
            return Ok(self.mock_optimization_report(holdings, request.objective));
        }

        let (snapshot, data_quality) = self.build_snapshot(holdings).await;

        let solver = WeightSolver::from_snapshot(&snapshot, self.config.engine.risk_free_rate)
            .with_constraints(request.constraints.clone())
            .with_tuning(
                self.config.optimizer.iterations,
                self.config.optimizer.learning_rate,
            );

        let optimal = solver.solve(request.objective);
        let current = current_weights(holdings, &snapshot.symbols);
        let capped = apply_turnover_cap(&current, &optimal, request.constraints.max_turnover);

        let total_value: Decimal = holdings.iter().map(|h| h.market_value()).sum();
        let prices: BTreeMap<String, Decimal> = holdings
            .iter()
            .map(|h| (h.symbol.clone(), h.current_price))
            .collect();

        let weight_map = solver.weight_map(&capped);
        let current_map = solver.weight_map(&current);
        let rebalancing = rebalancing_trades(&current_map, &weight_map, total_value, &prices);

        Ok(OptimizationReport {
            objective: request.objective,
            metrics: solver.metrics_for(&capped),
            risk_budget: risk_budget(&snapshot.symbols, &capped, &snapshot.covariance),
            efficient_frontier: solver.efficient_frontier(self.config.optimizer.frontier_points),
            weights: weight_map,
            current_weights: current_map,
            rebalancing,
            metadata: self.metadata(data_quality, holdings.len(), snapshot.symbols.len()),
        })
    }

    /// Fetch history and build the statistics snapshot, falling back to
    /// cost-basis proxies when fewer than two symbols have usable series.
    async fn build_snapshot(&self, holdings: &[Holding]) -> (StatisticsSnapshot, DataQuality) {
        let mut symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let benchmark = self.config.engine.benchmark_symbol.clone();
        symbols.push(benchmark.clone());

        let mut fetched = self.fetcher.fetch_all(&symbols).await;

        let benchmark_series = fetched.get(&benchmark).cloned().unwrap_or_default();
        fetched.retain(|symbol, _| holdings.iter().any(|h| &h.symbol == symbol));

        let snapshot = StatisticsSnapshot::compute(&fetched, &benchmark_series);
        if snapshot.symbols.len() >= 2 {
            debug!(symbols = snapshot.symbols.len(), "statistics built from real history");
            return (snapshot, DataQuality::Real);
        }

        info!(
            usable = snapshot.symbols.len(),
            "insufficient history, falling back to cost-basis proxy statistics"
        );
        let (symbols, expected_returns, covariance) = proxy_statistics(holdings);
        let n = symbols.len();
        let proxy = StatisticsSnapshot {
            symbols,
            returns: vec![Vec::new(); n],
            expected_returns,
            covariance,
            benchmark_returns: Vec::new(),
        };
        (proxy, DataQuality::Simplified)
    }

    fn metadata(
        &self,
        data_quality: DataQuality,
        requested: usize,
        analyzed: usize,
    ) -> ReportMetadata {
        ReportMetadata {
            data_quality,
            symbols_requested: requested,
            symbols_analyzed: analyzed,
            benchmark: self.config.engine.benchmark_symbol.clone(),
            generated_at: Utc::now(),
        }
    }

    fn mock_risk_report(&self, holdings: &[Holding]) -> RiskReport {
        let metrics = RiskMetrics {
            expected_return: dec!(0.08),
            variance: dec!(0.0225),
            volatility: dec!(0.15),
            sharpe_ratio: dec!(0.47),
            beta: Decimal::ONE,
            alpha: Decimal::ZERO,
            sortino_ratio: Decimal::ZERO,
            calmar_ratio: Decimal::ZERO,
            var_95_daily: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            tracking_error: Decimal::ZERO,
            information_ratio: Decimal::ZERO,
        };

        let correlation_matrix = holdings
            .iter()
            .map(|h| {
                let row = [(h.symbol.clone(), Decimal::ONE)].into_iter().collect();
                (h.symbol.clone(), row)
            })
            .collect();

        let weights: Vec<Decimal> = holdings.iter().map(|_| Decimal::ONE).collect();
        let concentration = analyze_concentration(holdings);
        let stress_tests = run_stress_tests(&weights);

        RiskReport {
            metrics,
            correlation_matrix,
            concentration,
            stress_tests,
            performance: performance_summary(holdings),
            insights: vec![
                "Portfolio has too few holdings for statistical analysis".to_string(),
            ],
            metadata: self.metadata(DataQuality::Mock, holdings.len(), 0),
        }
    }

    fn mock_optimization_report(
        &self,
        holdings: &[Holding],
        objective: OptimizationType,
    ) -> OptimizationReport {
        let weights: BTreeMap<String, Decimal> = holdings
            .iter()
            .map(|h| (h.symbol.clone(), Decimal::ONE))
            .collect();

        OptimizationReport {
            objective,
            metrics: PortfolioMetrics {
                expected_return: dec!(0.08),
                volatility: dec!(0.15),
                variance: dec!(0.0225),
                sharpe_ratio: dec!(0.47),
            },
            current_weights: weights.clone(),
            weights,
            rebalancing: Vec::new(),
            risk_budget: Vec::new(),
            efficient_frontier: Vec::new(),
            metadata: self.metadata(DataQuality::Mock, holdings.len(), 0),
        }
    }
}

/// Programmer-error checks; the only raising path in the engine
fn validate_holdings(holdings: &[Holding]) -> Result<()> {
    if holdings.is_empty() {
        return Err(EngineError::InvalidHoldings("no holdings supplied".to_string()));
    }

    for h in holdings {
        if h.symbol.trim().is_empty() {
            return Err(EngineError::InvalidHoldings("empty symbol".to_string()));
        }
        if h.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidHoldings(format!(
                "non-positive quantity for {}",
                h.symbol
            )));
        }
        if h.current_price < Decimal::ZERO {
            return Err(EngineError::InvalidHoldings(format!(
                "negative price for {}",
                h.symbol
            )));
        }
    }

    Ok(())
}

/// Current weights over the analyzed symbols, renormalized to that subset
fn current_weights(holdings: &[Holding], symbols: &[String]) -> Vec<Decimal> {
    let values: Vec<Decimal> = symbols
        .iter()
        .map(|symbol| {
            holdings
                .iter()
                .find(|h| &h.symbol == symbol)
                .map(|h| h.market_value())
                .unwrap_or(Decimal::ZERO)
        })
        .collect();

    let total: Decimal = values.iter().sum();
    if total > Decimal::ZERO {
        values.into_iter().map(|v| v / total).collect()
    } else if !symbols.is_empty() {
        vec![Decimal::ONE / Decimal::from(symbols.len() as u64); symbols.len()]
    } else {
        Vec::new()
    }
}

fn performance_summary(holdings: &[Holding]) -> PerformanceSummary {
    let total_value: Decimal = holdings.iter().map(|h| h.market_value()).sum();
    let total_cost_basis: Decimal = holdings.iter().map(|h| h.cost_basis()).sum();
    let total_unrealized_gain = total_value - total_cost_basis;
    let total_return_percent = if total_cost_basis > Decimal::ZERO {
        total_unrealized_gain / total_cost_basis * dec!(100)
    } else {
        Decimal::ZERO
    };

    let mut ranked: Vec<HoldingPerformance> = holdings
        .iter()
        .map(|h| HoldingPerformance {
            symbol: h.symbol.clone(),
            return_percent: h.unrealized_return() * dec!(100),
            gain: h.unrealized_gain(),
            weight_percent: if total_value > Decimal::ZERO {
                h.market_value() / total_value * dec!(100)
            } else {
                Decimal::ZERO
            },
        })
        .collect();
    ranked.sort_by(|a, b| b.return_percent.cmp(&a.return_percent));

    let top_performers: Vec<HoldingPerformance> = ranked.iter().take(5).cloned().collect();
    let worst_performers: Vec<HoldingPerformance> =
        ranked.iter().rev().take(5).cloned().collect();

    PerformanceSummary {
        total_value,
        total_cost_basis,
        total_unrealized_gain,
        total_return_percent,
        top_performers,
        worst_performers,
    }
}

fn generate_insights(
    metrics: &RiskMetrics,
    concentration: &ConcentrationAnalysis,
    stress_tests: &[StressResult],
) -> Vec<String> {
    let mut insights = Vec::new();

    match concentration.risk_level {
        RiskLevel::High => insights.push(format!(
            "Top 5 positions make up {}% of the portfolio; concentration risk is high",
            concentration.top5_concentration.round_dp(1)
        )),
        RiskLevel::Moderate => insights.push(format!(
            "Top 5 positions make up {}% of the portfolio; consider spreading further",
            concentration.top5_concentration.round_dp(1)
        )),
        RiskLevel::Low => {}
    }

    if metrics.volatility > dec!(0.25) {
        insights.push(format!(
            "Annualized volatility of {}% is elevated",
            (metrics.volatility * dec!(100)).round_dp(1)
        ));
    }

    if metrics.sharpe_ratio < Decimal::ONE && metrics.volatility > Decimal::ZERO {
        insights.push(format!(
            "Sharpe ratio of {} suggests returns are thin for the risk taken",
            metrics.sharpe_ratio.round_dp(2)
        ));
    }

    if let Some(worst) = stress_tests
        .iter()
        .min_by(|a, b| a.portfolio_impact.cmp(&b.portfolio_impact))
    {
        insights.push(format!(
            "Worst stress scenario ({}) implies a {}% portfolio impact",
            worst.scenario,
            (worst.portfolio_impact * dec!(100)).round_dp(1)
        ));
    }

    insights
}
