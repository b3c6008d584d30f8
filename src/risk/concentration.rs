//! Correlation matrix and position-concentration analysis

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::stats::StatisticsSnapshot;
use crate::types::{Holding, RiskLevel};

/// One position's share of the portfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConcentration {
    pub symbol: String,
    pub value: Decimal,
    /// Share of total portfolio value, 0-100
    pub percentage: Decimal,
    /// Flagged when the position exceeds 10% of the portfolio
    pub is_concentrated: bool,
}

/// Concentration block of the risk report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationAnalysis {
    /// Positions sorted descending by percentage
    pub positions: Vec<PositionConcentration>,
    pub top5_concentration: Decimal,
    pub top10_concentration: Decimal,
    /// Herfindahl-Hirschman index over percentage weights
    pub herfindahl_index: Decimal,
    pub concentrated_count: usize,
    pub risk_level: RiskLevel,
}

/// Classify position concentration.
///
/// The High/Moderate thresholds (top-5 share above 70/50, concentrated count
/// above 3/1) are a fixed heuristic kept for compatibility with the
/// dashboard's existing classification, not statistically derived.
pub fn analyze_concentration(holdings: &[Holding]) -> ConcentrationAnalysis {
    let total: Decimal = holdings.iter().map(|h| h.market_value()).sum();

    let mut positions: Vec<PositionConcentration> = holdings
        .iter()
        .map(|h| {
            let value = h.market_value();
            let percentage = if total > Decimal::ZERO {
                value / total * dec!(100)
            } else {
                Decimal::ZERO
            };
            PositionConcentration {
                symbol: h.symbol.clone(),
                value,
                percentage,
                is_concentrated: percentage > dec!(10),
            }
        })
        .collect();

    positions.sort_by(|a, b| b.percentage.cmp(&a.percentage));

    let top5_concentration: Decimal =
        positions.iter().take(5).map(|p| p.percentage).sum();
    let top10_concentration: Decimal =
        positions.iter().take(10).map(|p| p.percentage).sum();
    let herfindahl_index: Decimal =
        positions.iter().map(|p| p.percentage * p.percentage).sum();
    let concentrated_count = positions.iter().filter(|p| p.is_concentrated).count();

    let risk_level = if top5_concentration > dec!(70) || concentrated_count > 3 {
        RiskLevel::High
    } else if top5_concentration > dec!(50) || concentrated_count > 1 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    };

    ConcentrationAnalysis {
        positions,
        top5_concentration,
        top10_concentration,
        herfindahl_index,
        concentrated_count,
        risk_level,
    }
}

/// Pairwise correlation matrix `ρᵢⱼ = covᵢⱼ / (σᵢσⱼ)` in snapshot order.
///
/// The diagonal is forced to 1.0 and zero-volatility assets correlate 0 with
/// everything else.
pub fn correlation_matrix(snapshot: &StatisticsSnapshot) -> Vec<Vec<Decimal>> {
    let n = snapshot.symbols.len();
    let vols: Vec<Decimal> = (0..n).map(|i| snapshot.asset_volatility(i)).collect();

    let mut matrix = vec![vec![Decimal::ZERO; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                matrix[i][j] = Decimal::ONE;
            } else if vols[i] > Decimal::ZERO && vols[j] > Decimal::ZERO {
                matrix[i][j] = snapshot.covariance[i][j] / (vols[i] * vols[j]);
            }
        }
    }

    matrix
}

/// Correlation matrix keyed by symbol, as it appears in the JSON report
pub fn correlation_map(
    snapshot: &StatisticsSnapshot,
) -> BTreeMap<String, BTreeMap<String, Decimal>> {
    let matrix = correlation_matrix(snapshot);
    snapshot
        .symbols
        .iter()
        .enumerate()
        .map(|(i, sym)| {
            let row = snapshot
                .symbols
                .iter()
                .enumerate()
                .map(|(j, other)| (other.clone(), matrix[i][j]))
                .collect();
            (sym.clone(), row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, value: Decimal) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            quantity: Decimal::ONE,
            average_cost: value,
            current_price: value,
            current_value: Some(value),
        }
    }

    #[test]
    fn test_dominant_position_is_high_risk() {
        let holdings = vec![
            holding("AAPL", dec!(8000)),
            holding("MSFT", dec!(1000)),
            holding("GOOG", dec!(1000)),
        ];

        let analysis = analyze_concentration(&holdings);

        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert!(analysis.top5_concentration >= dec!(80));
        assert_eq!(analysis.positions[0].symbol, "AAPL");
        assert!(analysis.positions[0].is_concentrated);
    }

    #[test]
    fn test_two_concentrated_positions_is_moderate() {
        let holdings = vec![
            holding("A", dec!(20)),
            holding("B", dec!(20)),
            holding("C", dec!(8)),
            holding("D", dec!(8)),
            holding("E", dec!(8)),
            holding("F", dec!(8)),
            holding("G", dec!(7)),
            holding("H", dec!(7)),
            holding("I", dec!(7)),
            holding("J", dec!(7)),
        ];

        let analysis = analyze_concentration(&holdings);

        assert_eq!(analysis.concentrated_count, 2);
        assert_eq!(analysis.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_even_spread_is_low_risk() {
        let holdings: Vec<Holding> = (0..20)
            .map(|i| holding(&format!("S{i}"), dec!(100)))
            .collect();

        let analysis = analyze_concentration(&holdings);

        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert_eq!(analysis.concentrated_count, 0);
        assert_eq!(analysis.top5_concentration, dec!(25));
    }

    #[test]
    fn test_zero_total_value_guarded() {
        let holdings = vec![holding("A", Decimal::ZERO)];
        let analysis = analyze_concentration(&holdings);

        assert_eq!(analysis.positions[0].percentage, Decimal::ZERO);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_correlation_unit_diagonal_and_bounds() {
        let cov_ab = dec!(0.0216);
        let snapshot = StatisticsSnapshot {
            symbols: vec!["A".to_string(), "B".to_string()],
            returns: vec![Vec::new(), Vec::new()],
            expected_returns: vec![dec!(0.12), dec!(0.10)],
            covariance: vec![
                vec![dec!(0.04), cov_ab],
                vec![cov_ab, dec!(0.0324)],
            ],
            benchmark_returns: Vec::new(),
        };

        let matrix = correlation_matrix(&snapshot);

        assert_eq!(matrix[0][0], Decimal::ONE);
        assert_eq!(matrix[1][1], Decimal::ONE);
        assert_eq!(matrix[0][1], matrix[1][0]);
        assert!(matrix[0][1].abs() <= dec!(1.000001));
        // ρ = 0.0216 / (0.2 * 0.18) = 0.6
        assert!((matrix[0][1] - dec!(0.6)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_correlation_zero_volatility_guard() {
        let snapshot = StatisticsSnapshot {
            symbols: vec!["A".to_string(), "B".to_string()],
            returns: vec![Vec::new(), Vec::new()],
            expected_returns: vec![dec!(0.1), dec!(0.1)],
            covariance: vec![
                vec![Decimal::ZERO, Decimal::ZERO],
                vec![Decimal::ZERO, dec!(0.04)],
            ],
            benchmark_returns: Vec::new(),
        };

        let matrix = correlation_matrix(&snapshot);

        assert_eq!(matrix[0][0], Decimal::ONE);
        assert_eq!(matrix[0][1], Decimal::ZERO);
    }
}
