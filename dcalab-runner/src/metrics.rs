//! Performance metrics: pure functions over a simulated portfolio and a benchmark.
//!
//! Bar-level values are rolled up into calendar-month and calendar-year
//! return series for both the portfolio and the benchmark; dispersion,
//! co-movement, beta, alpha and Sharpe are derived per granularity.
//! Max drawdown is measured on the unrealized P&L curve.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use dcalab_core::{PortfolioSeries, PortfolioSnapshot, PriceSeries};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("misaligned series: {0}")]
    MisalignedSeries(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),

    #[error("invalid benchmark: {0}")]
    InvalidBenchmark(String),
}

/// Calendar bucket for period returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Monthly,
    Annual,
}

impl Granularity {
    /// True when `next` starts a new period relative to `prev`.
    pub fn is_boundary(&self, prev: NaiveDate, next: NaiveDate) -> bool {
        match self {
            Granularity::Monthly => prev.year() != next.year() || prev.month() != next.month(),
            Granularity::Annual => prev.year() != next.year(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Monthly => "monthly",
            Granularity::Annual => "annual",
        }
    }
}

/// How the portfolio is valued at period boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodValuation {
    /// `units * average_cost`: capital deployed at cost.
    #[default]
    CostBasis,
    /// `cash + units * close`.
    MarketValue,
}

impl PeriodValuation {
    pub fn value(&self, snapshot: &PortfolioSnapshot) -> f64 {
        match self {
            PeriodValuation::CostBasis => snapshot.state.cost_basis(),
            PeriodValuation::MarketValue => snapshot.market_value(),
        }
    }
}

/// Return over one calendar period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodReturn {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub value: f64,
}

/// Ordered period returns at one granularity. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    granularity: Granularity,
    periods: Vec<PeriodReturn>,
}

impl ReturnSeries {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn periods(&self) -> &[PeriodReturn] {
        &self.periods
    }

    pub fn values(&self) -> Vec<f64> {
        self.periods.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Statistics for one granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub granularity: Granularity,
    pub periods: usize,
    pub portfolio_stdev: f64,
    pub benchmark_stdev: f64,
    pub portfolio_variance: f64,
    pub benchmark_variance: f64,
    pub covariance: f64,
    pub beta: f64,
    pub alpha: f64,
    /// Absent when the portfolio's period returns have zero dispersion.
    pub sharpe_ratio: Option<f64>,
}

/// Full metrics for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub monthly: PeriodMetrics,
    /// Absent when the run spans fewer than two calendar years.
    pub annual: Option<PeriodMetrics>,
    pub total_portfolio_return: f64,
    pub total_benchmark_return: f64,
    pub max_drawdown: f64,
    pub risk_free_rate: f64,
    pub valuation: PeriodValuation,
}

/// Stateless calculator; the fields are run parameters, not accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsCalculator {
    pub risk_free_rate: f64,
    pub valuation: PeriodValuation,
}

impl MetricsCalculator {
    pub fn new(risk_free_rate: f64, valuation: PeriodValuation) -> Self {
        Self {
            risk_free_rate,
            valuation,
        }
    }

    pub fn compute(
        &self,
        portfolio: &PortfolioSeries,
        benchmark: &PriceSeries,
    ) -> Result<MetricsReport, MetricsError> {
        check_alignment(portfolio, benchmark)?;
        check_benchmark_prices(benchmark)?;

        let total_portfolio = total_portfolio_return(portfolio)?;
        let total_benchmark = total_benchmark_return(benchmark)?;

        let period = |granularity: Granularity| -> Result<PeriodMetrics, MetricsError> {
            let p = portfolio_returns(portfolio, granularity, self.valuation);
            let b = benchmark_returns(benchmark, granularity);
            period_metrics(
                granularity,
                &p.values(),
                &b.values(),
                total_portfolio,
                total_benchmark,
                self.risk_free_rate,
            )
        };

        let monthly = period(Granularity::Monthly)?;
        let annual = match period(Granularity::Annual) {
            Ok(m) => Some(m),
            Err(MetricsError::InsufficientData(reason)) => {
                warn!(%reason, "annual metrics unavailable");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(MetricsReport {
            monthly,
            annual,
            total_portfolio_return: total_portfolio,
            total_benchmark_return: total_benchmark,
            max_drawdown: max_drawdown(&portfolio.unrealized_pnl()),
            risk_free_rate: self.risk_free_rate,
            valuation: self.valuation,
        })
    }
}

/// Compute metrics with cost-basis period valuation.
pub fn compute(
    portfolio: &PortfolioSeries,
    benchmark: &PriceSeries,
    risk_free_rate: f64,
) -> Result<MetricsReport, MetricsError> {
    MetricsCalculator::new(risk_free_rate, PeriodValuation::CostBasis).compute(portfolio, benchmark)
}

// ─── Alignment ──────────────────────────────────────────────────────

pub fn check_alignment(
    portfolio: &PortfolioSeries,
    benchmark: &PriceSeries,
) -> Result<(), MetricsError> {
    if portfolio.len() != benchmark.len() {
        return Err(MetricsError::MisalignedSeries(format!(
            "portfolio has {} bars, benchmark has {}",
            portfolio.len(),
            benchmark.len()
        )));
    }
    if let Some((i, (p, b))) = portfolio
        .dates()
        .zip(benchmark.dates())
        .enumerate()
        .find(|(_, (p, b))| p != b)
    {
        return Err(MetricsError::MisalignedSeries(format!(
            "bar {i}: portfolio date {p} vs benchmark date {b}"
        )));
    }
    Ok(())
}

/// Every benchmark bar needs finite, positive open and close.
pub fn check_benchmark_prices(benchmark: &PriceSeries) -> Result<(), MetricsError> {
    match benchmark
        .iter()
        .enumerate()
        .find(|(_, b)| !b.has_positive_prices())
    {
        Some((i, b)) => Err(MetricsError::InvalidBenchmark(format!(
            "bar {i} on {}: open {} close {}",
            b.date, b.open, b.close
        ))),
        None => Ok(()),
    }
}

// ─── Period segmentation ────────────────────────────────────────────

/// Roll dated values into period returns.
///
/// Each period opens at its first bar's value and closes at its last bar's
/// value. A period that opens at a non-positive value has return 0.
///
/// Partial periods count as full ones: a series starting mid-month opens
/// with a short first month, and the trailing period closes at the final
/// bar wherever it falls. Jan 15 to Feb 15 therefore yields two monthly
/// returns.
pub fn period_returns(points: &[(NaiveDate, f64)], granularity: Granularity) -> ReturnSeries {
    let mut periods = Vec::new();
    let Some(&(first_date, first_value)) = points.first() else {
        return ReturnSeries {
            granularity,
            periods,
        };
    };

    let (mut start_date, mut start_value) = (first_date, first_value);
    let (mut prev_date, mut prev_value) = (first_date, first_value);

    for &(date, value) in &points[1..] {
        if granularity.is_boundary(prev_date, date) {
            periods.push(PeriodReturn {
                start: start_date,
                end: prev_date,
                value: simple_return(start_value, prev_value),
            });
            start_date = date;
            start_value = value;
        }
        prev_date = date;
        prev_value = value;
    }
    periods.push(PeriodReturn {
        start: start_date,
        end: prev_date,
        value: simple_return(start_value, prev_value),
    });

    ReturnSeries {
        granularity,
        periods,
    }
}

pub fn portfolio_returns(
    portfolio: &PortfolioSeries,
    granularity: Granularity,
    valuation: PeriodValuation,
) -> ReturnSeries {
    let points: Vec<(NaiveDate, f64)> = portfolio
        .snapshots()
        .iter()
        .map(|s| (s.date(), valuation.value(s)))
        .collect();
    period_returns(&points, granularity)
}

pub fn benchmark_returns(benchmark: &PriceSeries, granularity: Granularity) -> ReturnSeries {
    let points: Vec<(NaiveDate, f64)> = benchmark.iter().map(|b| (b.date, b.close)).collect();
    period_returns(&points, granularity)
}

fn simple_return(start: f64, end: f64) -> f64 {
    if start > 0.0 {
        (end - start) / start
    } else {
        0.0
    }
}

// ─── Totals ─────────────────────────────────────────────────────────

/// Final unrealized P&L over the capital in play at bar 0
/// (`units * average_cost + cash`).
pub fn total_portfolio_return(portfolio: &PortfolioSeries) -> Result<f64, MetricsError> {
    let (first, last) = match (portfolio.first(), portfolio.last()) {
        (Some(f), Some(l)) => (f.state, l.state),
        _ => return Err(MetricsError::InsufficientData("portfolio series is empty".into())),
    };
    let initial = first.cost_basis() + first.cash_balance;
    if initial <= 0.0 {
        return Err(MetricsError::DivisionByZero("initial portfolio capital is zero"));
    }
    Ok(last.unrealized_pnl / initial)
}

/// First open to last close.
pub fn total_benchmark_return(benchmark: &PriceSeries) -> Result<f64, MetricsError> {
    let (first, last) = match (benchmark.first(), benchmark.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(MetricsError::InsufficientData("benchmark series is empty".into())),
    };
    if first.open <= 0.0 {
        return Err(MetricsError::DivisionByZero("benchmark first open is zero"));
    }
    Ok((last.close - first.open) / first.open)
}

// ─── Per-granularity statistics ─────────────────────────────────────

pub fn period_metrics(
    granularity: Granularity,
    portfolio: &[f64],
    benchmark: &[f64],
    total_portfolio_return: f64,
    total_benchmark_return: f64,
    risk_free_rate: f64,
) -> Result<PeriodMetrics, MetricsError> {
    if portfolio.len() != benchmark.len() {
        return Err(MetricsError::MisalignedSeries(format!(
            "{} portfolio periods vs {} benchmark periods",
            portfolio.len(),
            benchmark.len()
        )));
    }
    let insufficient = || {
        MetricsError::InsufficientData(format!(
            "{} {} period(s), need at least 2",
            portfolio.len(),
            granularity.label()
        ))
    };

    let portfolio_variance = sample_variance(portfolio).ok_or_else(insufficient)?;
    let benchmark_variance = sample_variance(benchmark).ok_or_else(insufficient)?;
    let covariance = sample_covariance(portfolio, benchmark).ok_or_else(insufficient)?;
    let beta = beta(portfolio, benchmark)?;

    let portfolio_stdev = portfolio_variance.sqrt();
    let excess_portfolio = total_portfolio_return - risk_free_rate;
    let alpha = excess_portfolio - beta * (total_benchmark_return - risk_free_rate);
    let sharpe_ratio = (portfolio_stdev > 0.0).then(|| excess_portfolio / portfolio_stdev);

    Ok(PeriodMetrics {
        granularity,
        periods: portfolio.len(),
        portfolio_stdev,
        benchmark_stdev: benchmark_variance.sqrt(),
        portfolio_variance,
        benchmark_variance,
        covariance,
        beta,
        alpha,
        sharpe_ratio,
    })
}

/// covariance(portfolio, benchmark) / variance(benchmark).
pub fn beta(portfolio: &[f64], benchmark: &[f64]) -> Result<f64, MetricsError> {
    let cov = sample_covariance(portfolio, benchmark).ok_or_else(|| {
        MetricsError::InsufficientData("beta needs at least 2 aligned periods".into())
    })?;
    let var = sample_variance(benchmark).ok_or_else(|| {
        MetricsError::InsufficientData("beta needs at least 2 benchmark periods".into())
    })?;
    if var == 0.0 {
        return Err(MetricsError::InsufficientData(
            "benchmark returns have zero variance".into(),
        ));
    }
    Ok(cov / var)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Bessel-corrected variance. `None` for fewer than two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    sample_covariance(values, values)
}

pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Bessel-corrected covariance. `None` for mismatched lengths or fewer than two values.
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let sum: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    Some(sum / (xs.len() - 1) as f64)
}

/// Largest drop from a running peak, in the series' own units.
///
/// Returns 0.0 for empty or non-decreasing series.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        max_dd = max_dd.max(peak - v);
    }
    max_dd
}
