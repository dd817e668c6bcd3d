//! Parameter sweeps over DCA policies.
//!
//! Every grid point runs `simulate` + `compute` on its own copy of the input
//! series; runs share nothing and execute in parallel on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use dcalab_core::{PriceSeries, PurchaseMode, PurchasePolicy};

use crate::metrics::MetricsCalculator;
use crate::runner::{run_with_series, RunError, RunResult};

/// Parameter grid for DCA sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub interval_days: Vec<u32>,
    pub lot_sizes: Vec<f64>,
    pub modes: Vec<PurchaseMode>,
    /// Also evaluate lump-sum in each mode as a baseline.
    #[serde(default)]
    pub include_lump_sum: bool,
}

impl SweepGrid {
    /// Weekly, monthly and quarterly fractional DCA with a lump-sum baseline.
    pub fn default_for_lot(lot_size: f64) -> Self {
        Self {
            interval_days: vec![5, 21, 63],
            lot_sizes: vec![lot_size],
            modes: vec![PurchaseMode::FractionalCash],
            include_lump_sum: true,
        }
    }

    /// Returns the total number of policies in this grid.
    pub fn size(&self) -> usize {
        let lump = if self.include_lump_sum {
            self.modes.len()
        } else {
            0
        };
        self.interval_days.len() * self.lot_sizes.len() * self.modes.len() + lump
    }

    /// Expand the grid into concrete policies.
    pub fn policies(&self) -> Vec<PurchasePolicy> {
        let mut policies = Vec::with_capacity(self.size());
        for &mode in &self.modes {
            if self.include_lump_sum {
                policies.push(PurchasePolicy::lump_sum(mode));
            }
            for &interval in &self.interval_days {
                for &lot in &self.lot_sizes {
                    policies.push(PurchasePolicy::dca(interval, mode, lot));
                }
            }
        }
        policies
    }
}

/// One evaluated grid point. Invalid points carry their error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    pub policy: PurchasePolicy,
    pub outcome: Result<SweepSummary, String>,
}

/// Headline numbers for a sweep row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub final_pnl: f64,
    pub final_cash: f64,
    pub units_held: f64,
    pub average_cost: f64,
    pub purchase_count: usize,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub monthly_beta: f64,
    pub monthly_sharpe: Option<f64>,
    pub annual_beta: Option<f64>,
}

impl From<&RunResult> for SweepSummary {
    fn from(r: &RunResult) -> Self {
        Self {
            final_pnl: r.final_state.unrealized_pnl,
            final_cash: r.final_state.cash_balance,
            units_held: r.final_state.units_held,
            average_cost: r.final_state.average_cost,
            purchase_count: r.purchase_count,
            total_return: r.metrics.total_portfolio_return,
            max_drawdown: r.metrics.max_drawdown,
            monthly_beta: r.metrics.monthly.beta,
            monthly_sharpe: r.metrics.monthly.sharpe_ratio,
            annual_beta: r.metrics.annual.as_ref().map(|a| a.beta),
        }
    }
}

/// Evaluate every policy in the grid.
///
/// Results are ranked by final unrealized P&L, best first; failed runs sort last.
pub fn run_sweep(
    grid: &SweepGrid,
    starting_capital: f64,
    prices: &PriceSeries,
    benchmark: &PriceSeries,
    calculator: &MetricsCalculator,
) -> Vec<SweepEntry> {
    let policies = grid.policies();
    info!(points = policies.len(), bars = prices.len(), "starting sweep");

    let mut entries: Vec<SweepEntry> = policies
        .into_par_iter()
        .map(|policy| {
            let prices = prices.clone();
            let benchmark = benchmark.clone();
            let outcome = run_one(&policy, starting_capital, &prices, &benchmark, calculator)
                .map(|r| SweepSummary::from(&r))
                .map_err(|e| e.to_string());
            SweepEntry { policy, outcome }
        })
        .collect();

    entries.sort_by(|a, b| match (&a.outcome, &b.outcome) {
        (Ok(x), Ok(y)) => y.final_pnl.total_cmp(&x.final_pnl),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => std::cmp::Ordering::Equal,
    });
    entries
}

fn run_one(
    policy: &PurchasePolicy,
    starting_capital: f64,
    prices: &PriceSeries,
    benchmark: &PriceSeries,
    calculator: &MetricsCalculator,
) -> Result<RunResult, RunError> {
    run_with_series(
        &policy.describe(),
        starting_capital,
        prices,
        benchmark,
        policy,
        calculator,
    )
}
