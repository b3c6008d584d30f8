//! Stress test engine
//!
//! Applies a fixed library of historical/hypothetical market scenarios to a
//! weight vector. This is a linear shock model — every asset takes the
//! scenario's market shock amplified by its correlation-increase factor —
//! and deliberately not a Monte Carlo simulation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::RiskLevel;

/// A named market scenario: a market-wide shock plus a correlation spike
/// factor that amplifies it across the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    /// Market-wide decline as a signed fraction (-0.37 = -37%)
    pub market_shock: Decimal,
    /// Crisis correlation amplification (0.2 = impacts scaled by 1.2)
    pub correlation_increase: Decimal,
}

/// Outcome of one scenario against one weight vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario: String,
    /// Portfolio-level impact as a signed fraction
    pub portfolio_impact: Decimal,
    pub risk_level: RiskLevel,
}

/// The static scenario library
pub fn scenario_library() -> Vec<StressScenario> {
    vec![
        StressScenario {
            name: "2008 Financial Crisis".to_string(),
            market_shock: dec!(-0.37),
            correlation_increase: dec!(0.2),
        },
        StressScenario {
            name: "2020 Pandemic Crash".to_string(),
            market_shock: dec!(-0.34),
            correlation_increase: dec!(0.15),
        },
        StressScenario {
            name: "Rate Shock".to_string(),
            market_shock: dec!(-0.15),
            correlation_increase: dec!(0.10),
        },
        StressScenario {
            name: "Tech Correction".to_string(),
            market_shock: dec!(-0.25),
            correlation_increase: dec!(0.10),
        },
        StressScenario {
            name: "Black Swan".to_string(),
            market_shock: dec!(-0.45),
            correlation_increase: dec!(0.25),
        },
    ]
}

/// Run every scenario in the library against the given weights.
///
/// `weights` are position weights summing to ~1; per-symbol impact is
/// `market_shock * (1 + correlation_increase)` and the portfolio impact is
/// the weight-weighted sum.
pub fn run_stress_tests(weights: &[Decimal]) -> Vec<StressResult> {
    scenario_library()
        .into_iter()
        .map(|scenario| apply_scenario(&scenario, weights))
        .collect()
}

/// Apply one scenario to a weight vector
pub fn apply_scenario(scenario: &StressScenario, weights: &[Decimal]) -> StressResult {
    let symbol_impact =
        scenario.market_shock * (Decimal::ONE + scenario.correlation_increase);

    let portfolio_impact: Decimal = weights.iter().map(|w| *w * symbol_impact).sum();

    let magnitude = portfolio_impact.abs();
    let risk_level = if magnitude > dec!(0.25) {
        RiskLevel::High
    } else if magnitude > dec!(0.15) {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    };

    StressResult {
        scenario: scenario.name.clone(),
        portfolio_impact,
        risk_level,
    }
}
