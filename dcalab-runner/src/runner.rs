//! Run orchestration: wires loading, simulation and metrics together.
//!
//! Two entry points:
//! - `run_from_config()`: loads price and benchmark CSVs, then runs. Used by the CLI.
//! - `run_with_series()`: takes pre-loaded series, no I/O. Used by sweeps and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use dcalab_core::{simulate, PortfolioSeries, PortfolioState, PriceSeries, PurchasePolicy, SimulationError};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{dataset_hash, load_price_csv, LoadError};
use crate::metrics::{MetricsCalculator, MetricsError, MetricsReport};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub name: String,
    pub policy: PurchasePolicy,
    pub starting_capital: f64,
    pub start_date: String,
    pub end_date: String,
    pub bar_count: usize,
    pub purchase_count: usize,
    pub dataset_hash: String,
    pub final_state: PortfolioState,
    pub metrics: MetricsReport,
    pub portfolio: PortfolioSeries,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run from a config: load data, simulate, compute metrics.
pub fn run_from_config(config: &RunConfig) -> Result<RunResult, RunError> {
    config.validate()?;
    let prices = load_price_csv(&config.run.prices)?;
    let benchmark = if config.benchmark_path() == config.run.prices.as_path() {
        prices.clone()
    } else {
        load_price_csv(config.benchmark_path())?
    };

    let mut result = run_with_series(
        &config.run.name,
        config.run.starting_capital,
        &prices,
        &benchmark,
        &config.policy,
        &config.metrics_calculator(),
    )?;
    result.run_id = config.run_id();
    Ok(result)
}

/// Run against pre-loaded series without any I/O.
///
/// The benchmark must cover exactly the same dates as `prices`.
pub fn run_with_series(
    name: &str,
    starting_capital: f64,
    prices: &PriceSeries,
    benchmark: &PriceSeries,
    policy: &PurchasePolicy,
    calculator: &MetricsCalculator,
) -> Result<RunResult, RunError> {
    info!(
        name,
        policy = %policy.describe(),
        bars = prices.len(),
        starting_capital,
        "starting run"
    );

    let portfolio = simulate(starting_capital, prices, policy)?;
    let purchases = portfolio.purchases();
    if let (Some((first, _)), Some((last, _))) = (purchases.first(), purchases.last()) {
        debug!(
            count = purchases.len(),
            first_bar = first,
            last_bar = last,
            "purchases executed"
        );
    }

    let metrics = calculator.compute(&portfolio, benchmark)?;
    // simulate() rejects empty series, so both ends exist.
    let final_state = portfolio.final_state().unwrap_or_default();
    let start_date = prices.first().map(|b| b.date.to_string()).unwrap_or_default();
    let end_date = prices.last().map(|b| b.date.to_string()).unwrap_or_default();

    info!(
        name,
        final_pnl = final_state.unrealized_pnl,
        total_return = metrics.total_portfolio_return,
        max_drawdown = metrics.max_drawdown,
        "run complete"
    );

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        run_id: String::new(),
        name: name.to_string(),
        policy: *policy,
        starting_capital,
        start_date,
        end_date,
        bar_count: portfolio.len(),
        purchase_count: purchases.len(),
        dataset_hash: dataset_hash(prices),
        final_state,
        metrics,
        portfolio,
    })
}
