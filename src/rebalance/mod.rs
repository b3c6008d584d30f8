//! Rebalancing trades and risk-budget decomposition
//!
//! Diffs current vs. optimal weight vectors into actionable trade
//! recommendations and decomposes portfolio variance into per-asset risk
//! contributions.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Recommendation urgency; High above a 5-point weight shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradePriority {
    High,
    Medium,
}

/// One rebalancing trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecommendation {
    pub symbol: String,
    pub action: TradeAction,
    pub current_weight: Decimal,
    pub target_weight: Decimal,
    pub weight_delta: Decimal,
    /// Dollar size of the trade
    pub amount: Decimal,
    /// Share count at the current price; zero when no price is known
    pub shares: Decimal,
    pub priority: TradePriority,
}

/// Weight shifts below this threshold are noise, not trades
const MIN_TRADE_DELTA: Decimal = dec!(0.01);

/// Weight shifts above this are high priority
const HIGH_PRIORITY_DELTA: Decimal = dec!(0.05);

/// Diff current vs. optimal weights into trades.
///
/// Works over the union of both symbol sets; emits a recommendation only for
/// shifts above 1 point, sized in dollars against the total portfolio value
/// and in shares against the symbol's current price. Sorted descending by
/// shift magnitude.
pub fn rebalancing_trades(
    current: &BTreeMap<String, Decimal>,
    optimal: &BTreeMap<String, Decimal>,
    total_value: Decimal,
    prices: &BTreeMap<String, Decimal>,
) -> Vec<TradeRecommendation> {
    let symbols: BTreeSet<&String> = current.keys().chain(optimal.keys()).collect();

    let mut trades: Vec<TradeRecommendation> = symbols
        .into_iter()
        .filter_map(|symbol| {
            let current_weight = current.get(symbol).copied().unwrap_or(Decimal::ZERO);
            let target_weight = optimal.get(symbol).copied().unwrap_or(Decimal::ZERO);
            let delta = target_weight - current_weight;

            if delta.abs() <= MIN_TRADE_DELTA {
                return None;
            }

            let amount = delta.abs() * total_value;
            let shares = match prices.get(symbol) {
                Some(price) if *price > Decimal::ZERO => amount / *price,
                _ => Decimal::ZERO,
            };

            Some(TradeRecommendation {
                symbol: symbol.clone(),
                action: if delta > Decimal::ZERO {
                    TradeAction::Buy
                } else {
                    TradeAction::Sell
                },
                current_weight,
                target_weight,
                weight_delta: delta,
                amount,
                shares,
                priority: if delta.abs() > HIGH_PRIORITY_DELTA {
                    TradePriority::High
                } else {
                    TradePriority::Medium
                },
            })
        })
        .collect();

    trades.sort_by(|a, b| b.weight_delta.abs().cmp(&a.weight_delta.abs()));
    trades
}

/// One asset's share of portfolio risk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBudgetEntry {
    pub symbol: String,
    pub weight: Decimal,
    /// `Σⱼ wⱼ·covᵢⱼ`
    pub marginal_risk: Decimal,
    /// `wᵢ · marginal_risk`
    pub risk_contribution: Decimal,
    /// Contribution as a share of portfolio variance, 0-100
    pub risk_contribution_percent: Decimal,
    /// Risk share per weight point; above 1 the asset carries more risk
    /// than capital
    pub risk_density: Decimal,
}

/// Decompose portfolio variance into per-asset contributions, sorted
/// descending by contribution.
pub fn risk_budget(
    symbols: &[String],
    weights: &[Decimal],
    covariance: &[Vec<Decimal>],
) -> Vec<RiskBudgetEntry> {
    let n = symbols.len().min(weights.len()).min(covariance.len());

    let mut portfolio_variance = Decimal::ZERO;
    for i in 0..n {
        for j in 0..n {
            portfolio_variance += weights[i] * weights[j] * covariance[i][j];
        }
    }

    let mut entries: Vec<RiskBudgetEntry> = (0..n)
        .map(|i| {
            let mut marginal_risk = Decimal::ZERO;
            for j in 0..n {
                marginal_risk += weights[j] * covariance[i][j];
            }

            let risk_contribution = weights[i] * marginal_risk;
            let risk_contribution_percent = if portfolio_variance > Decimal::ZERO {
                risk_contribution / portfolio_variance * dec!(100)
            } else {
                Decimal::ZERO
            };
            let risk_density = if weights[i] > Decimal::ZERO {
                risk_contribution_percent / (weights[i] * dec!(100))
            } else {
                Decimal::ZERO
            };

            RiskBudgetEntry {
                symbol: symbols[i].clone(),
                weight: weights[i],
                marginal_risk,
                risk_contribution,
                risk_contribution_percent,
                risk_density,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.risk_contribution.cmp(&a.risk_contribution));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_map(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs.iter().map(|(s, w)| (s.to_string(), *w)).collect()
    }

    #[test]
    fn test_matching_weights_produce_no_trades() {
        let current = weight_map(&[("A", dec!(0.6)), ("B", dec!(0.4))]);
        let optimal = weight_map(&[("A", dec!(0.605)), ("B", dec!(0.395))]);
        let prices = weight_map(&[("A", dec!(100)), ("B", dec!(50))]);

        let trades = rebalancing_trades(&current, &optimal, dec!(10000), &prices);
        assert!(trades.is_empty());
    }

    #[test]
    fn test_trades_sorted_and_sized() {
        let current = weight_map(&[("A", dec!(0.70)), ("B", dec!(0.27)), ("C", dec!(0.03))]);
        let optimal = weight_map(&[("A", dec!(0.40)), ("B", dec!(0.40)), ("C", dec!(0.20))]);
        let prices = weight_map(&[("A", dec!(100)), ("B", dec!(50)), ("C", dec!(20))]);

        let trades = rebalancing_trades(&current, &optimal, dec!(10000), &prices);

        assert_eq!(trades.len(), 3);
        // Largest shift first: A -30 points, then C +17, then B +13
        assert_eq!(trades[0].symbol, "A");
        assert_eq!(trades[0].action, TradeAction::Sell);
        assert_eq!(trades[0].priority, TradePriority::High);
        assert_eq!(trades[0].amount, dec!(3000));
        assert_eq!(trades[0].shares, dec!(30));

        assert_eq!(trades[1].symbol, "C");
        assert_eq!(trades[1].action, TradeAction::Buy);
        assert_eq!(trades[2].symbol, "B");
    }

    #[test]
    fn test_symbol_only_in_optimal_is_a_buy() {
        let current = weight_map(&[("A", dec!(1.0))]);
        let optimal = weight_map(&[("A", dec!(0.6)), ("NEW", dec!(0.4))]);
        let prices = weight_map(&[("A", dec!(10))]);

        let trades = rebalancing_trades(&current, &optimal, dec!(1000), &prices);

        let new_trade = trades.iter().find(|t| t.symbol == "NEW").unwrap();
        assert_eq!(new_trade.action, TradeAction::Buy);
        assert_eq!(new_trade.current_weight, Decimal::ZERO);
        // No price known for NEW yet
        assert_eq!(new_trade.shares, Decimal::ZERO);
    }

    #[test]
    fn test_medium_priority_below_threshold() {
        let current = weight_map(&[("A", dec!(0.52)), ("B", dec!(0.48))]);
        let optimal = weight_map(&[("A", dec!(0.50)), ("B", dec!(0.50))]);
        let prices = weight_map(&[("A", dec!(100)), ("B", dec!(100))]);

        let trades = rebalancing_trades(&current, &optimal, dec!(10000), &prices);

        assert_eq!(trades.len(), 2);
        for trade in &trades {
            assert_eq!(trade.priority, TradePriority::Medium);
        }
    }

    #[test]
    fn test_risk_budget_uncorrelated_equal_weights() {
        let symbols = vec!["A".to_string(), "B".to_string()];
        let weights = vec![dec!(0.5), dec!(0.5)];
        let covariance = vec![
            vec![dec!(0.04), Decimal::ZERO],
            vec![Decimal::ZERO, dec!(0.04)],
        ];

        let entries = risk_budget(&symbols, &weights, &covariance);

        // Identical assets split the risk evenly
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].risk_contribution_percent, dec!(50));
        assert_eq!(entries[1].risk_contribution_percent, dec!(50));
        assert_eq!(entries[0].risk_density, Decimal::ONE);
    }

    #[test]
    fn test_risk_budget_percentages_sum_to_hundred() {
        let symbols = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let weights = vec![dec!(0.5), dec!(0.3), dec!(0.2)];
        let covariance = vec![
            vec![dec!(0.09), dec!(0.02), dec!(0.01)],
            vec![dec!(0.02), dec!(0.04), dec!(0.015)],
            vec![dec!(0.01), dec!(0.015), dec!(0.0625)],
        ];

        let entries = risk_budget(&symbols, &weights, &covariance);

        let total: Decimal = entries.iter().map(|e| e.risk_contribution_percent).sum();
        assert!((total - dec!(100)).abs() < dec!(0.0001));

        // Sorted descending by contribution
        for pair in entries.windows(2) {
            assert!(pair[0].risk_contribution >= pair[1].risk_contribution);
        }
        // The heavy, volatile asset dominates the budget
        assert_eq!(entries[0].symbol, "A");
        assert!(entries[0].risk_density > Decimal::ONE);
    }

    #[test]
    fn test_risk_budget_zero_variance_guarded() {
        let symbols = vec!["A".to_string()];
        let weights = vec![Decimal::ONE];
        let covariance = vec![vec![Decimal::ZERO]];

        let entries = risk_budget(&symbols, &weights, &covariance);

        assert_eq!(entries[0].risk_contribution_percent, Decimal::ZERO);
        assert_eq!(entries[0].risk_density, Decimal::ZERO);
    }
}
