//! Portfolio Risk & Optimization Engine
//!
//! The numerical core of the markets dashboard backend: turns a set of
//! holdings plus historical price series into a risk report and an optimized
//! target allocation with the trades to reach it.
//!
//! ## Architecture
//!
//! ```text
//! Holdings + Price History (external provider)
//!              │
//!              ▼
//!     Returns & Statistics ──► Risk Metrics / Correlation / Stress Tests
//!              │                              │
//!              ▼                              ▼
//!     Optimization (max-Sharpe, min-risk, target-return, frontier)
//!              │
//!              ▼
//!     Rebalancing & Risk Budget ──► JSON reports
//! ```
//!
//! The engine always returns a fully-shaped report; when history is missing
//! it degrades to cost-basis proxy statistics (`data_quality = simplified`)
//! or a mock report (`mock`) instead of failing.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod optimizer;
pub mod rebalance;
pub mod risk;
pub mod stats;
pub mod types;

#[cfg(test)]
mod config_tests;
