//! Engine error types

use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the risk engine.
///
/// Data-quality problems (missing history, short series, degenerate
/// statistics) are handled internally via simplified/mock report modes and
/// never reach callers through this type. What remains is programmer error
/// and infrastructure failure.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid holdings: {0}")]
    InvalidHoldings(String),

    #[error("market data provider error: {0}")]
    Provider(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
