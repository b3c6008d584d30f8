//! Portfolio risk engine CLI
//!
//! Thin command-line front over the engine: feed it a holdings JSON file,
//! get a JSON report back.

use clap::{Parser, Subcommand, ValueEnum};
use risk_engine::{
    client::HistoryClient,
    config::EngineConfig,
    engine::{OptimizationRequest, RiskEngine},
    optimizer::{OptimizationConstraints, OptimizationType},
    types::Holding,
};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "risk-engine")]
#[command(about = "Portfolio risk and optimization engine for the markets dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce a full risk report for a holdings file
    Risk {
        /// Path to a JSON array of holdings
        holdings: String,
    },
    /// Solve target weights and the trades to reach them
    Optimize {
        /// Path to a JSON array of holdings
        holdings: String,
        /// Solver objective
        #[arg(short, long, value_enum, default_value = "max_sharpe")]
        objective: Objective,
        /// Override the per-asset weight cap
        #[arg(long)]
        max_weight: Option<Decimal>,
        /// Target return for the target-return objective
        #[arg(long)]
        target_return: Option<Decimal>,
    },
    /// Sweep the efficient frontier
    Frontier {
        /// Path to a JSON array of holdings
        holdings: String,
    },
    /// Show the latest quote for a symbol
    Quote { symbol: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Objective {
    #[value(name = "max_sharpe")]
    MaxSharpe,
    #[value(name = "min_risk")]
    MinRisk,
    #[value(name = "target_return")]
    TargetReturn,
}

impl From<Objective> for OptimizationType {
    fn from(objective: Objective) -> Self {
        match objective {
            Objective::MaxSharpe => OptimizationType::MaxSharpe,
            Objective::MinRisk => OptimizationType::MinRisk,
            Objective::TargetReturn => OptimizationType::TargetReturn,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = EngineConfig::load(&cli.config)?;
    let provider = HistoryClient::new(&config.provider)?;
    let engine = RiskEngine::new(provider, config);

    match cli.command {
        Commands::Risk { holdings } => {
            let holdings = load_holdings(&holdings)?;
            let report = engine.calculate_portfolio_risk(&holdings).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Optimize {
            holdings,
            objective,
            max_weight,
            target_return,
        } => {
            let holdings = load_holdings(&holdings)?;
            let mut constraints = OptimizationConstraints::default();
            if let Some(max_weight) = max_weight {
                constraints.max_weight = max_weight;
            }
            constraints.target_return = target_return;

            let request = OptimizationRequest {
                objective: objective.into(),
                constraints,
            };
            let report = engine.optimize_portfolio(&holdings, request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Frontier { holdings } => {
            let holdings = load_holdings(&holdings)?;
            let report = engine
                .optimize_portfolio(&holdings, OptimizationRequest::default())
                .await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report.efficient_frontier)?
            );
        }
        Commands::Quote { symbol } => {
            let quote = engine.latest_quote(&symbol).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
    }

    Ok(())
}

fn load_holdings(path: &str) -> anyhow::Result<Vec<Holding>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
