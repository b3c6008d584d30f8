//! Engine configuration
//!
//! Loaded from a TOML file with `RISK_ENGINE_*` environment overrides.
//! Every field has a serde default so a missing or empty file still yields a
//! working configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::Result;

/// Top-level engine configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: AnalysisConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

/// Statistical parameters shared by the risk and optimization paths
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Annual risk-free rate used in Sharpe/Sortino/Alpha
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Decimal,
    /// Benchmark symbol for Beta/Alpha/tracking error
    #[serde(default = "default_benchmark")]
    pub benchmark_symbol: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            benchmark_symbol: default_benchmark(),
        }
    }
}

/// Market data provider endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Batching knobs for historical price fetches.
///
/// The provider rate-limits aggressively; symbols are fetched in small
/// batches with a pause in between.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// TTL for the request-scoped history cache
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Solver parameters
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    /// Fixed iteration budget for the max-Sharpe ascent
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: Decimal,
    /// Points in the efficient-frontier sweep
    #[serde(default = "default_frontier_points")]
    pub frontier_points: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            learning_rate: default_learning_rate(),
            frontier_points: default_frontier_points(),
        }
    }
}

fn default_risk_free_rate() -> Decimal {
    dec!(0.045)
}

fn default_benchmark() -> String {
    "SPY".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    4
}

fn default_batch_delay_ms() -> u64 {
    200
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_iterations() -> usize {
    50
}

fn default_learning_rate() -> Decimal {
    dec!(0.1)
}

fn default_frontier_points() -> usize {
    30
}

impl EngineConfig {
    /// Load configuration from a TOML file, with `RISK_ENGINE_*` environment
    /// variables taking precedence. A missing file falls back to defaults.
    pub fn load(path: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("RISK_ENGINE")
                    .separator("__"),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}
