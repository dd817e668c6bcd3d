//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: the bar-by-bar portfolio table (the columns a plotting tool
//!   reads: `Date` against `Unrealized PnL`) and sweep tables
//! - **Markdown**: human-readable single-run report
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::metrics::{MetricsReport, PeriodMetrics};
use crate::runner::{RunResult, SCHEMA_VERSION};
use crate::sweep::SweepEntry;
use dcalab_core::PortfolioSeries;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: Date, Open, Close, Balance, Shares, Avg_cost, Unrealized PnL, Bought
pub fn export_portfolio_csv(portfolio: &PortfolioSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Date",
        "Open",
        "Close",
        "Balance",
        "Shares",
        "Avg_cost",
        "Unrealized PnL",
        "Bought",
    ])?;
    for snap in portfolio.snapshots() {
        let s = snap.state;
        wtr.write_record([
            snap.bar.date.to_string(),
            format!("{:.6}", snap.bar.open),
            format!("{:.6}", snap.bar.close),
            format!("{:.2}", s.cash_balance),
            format!("{:.6}", s.units_held),
            format!("{:.6}", s.average_cost),
            format!("{:.2}", s.unrealized_pnl),
            snap.purchase
                .map(|p| format!("{:.6}", p.units))
                .unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_sweep_csv(entries: &[SweepEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "policy",
        "final_pnl",
        "final_cash",
        "units_held",
        "average_cost",
        "purchases",
        "total_return",
        "max_drawdown",
        "monthly_beta",
        "monthly_sharpe",
        "annual_beta",
        "error",
    ])?;
    for e in entries {
        let row = match &e.outcome {
            Ok(s) => vec![
                e.policy.describe(),
                format!("{:.2}", s.final_pnl),
                format!("{:.2}", s.final_cash),
                format!("{:.6}", s.units_held),
                format!("{:.6}", s.average_cost),
                s.purchase_count.to_string(),
                format!("{:.6}", s.total_return),
                format!("{:.2}", s.max_drawdown),
                format!("{:.4}", s.monthly_beta),
                opt(s.monthly_sharpe, 4),
                opt(s.annual_beta, 4),
                String::new(),
            ],
            Err(msg) => {
                let mut row = vec![e.policy.describe()];
                row.extend(std::iter::repeat(String::new()).take(10));
                row.push(msg.clone());
                row
            }
        };
        wtr.write_record(&row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format!("{x:.decimals$}")).unwrap_or_default()
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn render_markdown_report(result: &RunResult) -> String {
    let state = &result.final_state;
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", result.name));
    md.push_str("| | |\n|---|---|\n");
    md.push_str(&format!("| Policy | `{}` |\n", result.policy.describe()));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!(
        "| Starting capital | {:.2} |\n",
        result.starting_capital
    ));
    md.push_str(&format!("| Purchases | {} |\n", result.purchase_count));
    md.push_str(&format!("| Units held | {:.6} |\n", state.units_held));
    md.push_str(&format!("| Average cost | {:.4} |\n", state.average_cost));
    md.push_str(&format!("| Idle cash | {:.2} |\n", state.cash_balance));
    md.push_str(&format!("| Unrealized P&L | {:.2} |\n\n", state.unrealized_pnl));
    md.push_str(&render_metrics_table(&result.metrics));
    md
}

fn render_metrics_table(m: &MetricsReport) -> String {
    let mut md = String::from("## Metrics\n\n");
    md.push_str(&format!(
        "Total return {:.2}% vs benchmark {:.2}% (risk-free {:.2}%, {:?} valuation). Max drawdown {:.2}.\n\n",
        m.total_portfolio_return * 100.0,
        m.total_benchmark_return * 100.0,
        m.risk_free_rate * 100.0,
        m.valuation,
        m.max_drawdown
    ));
    md.push_str("| | Monthly | Annual |\n|---|---|---|\n");
    let a = m.annual.as_ref();
    let rows: [(&str, fn(&PeriodMetrics) -> Option<f64>); 7] = [
        ("Portfolio stdev", |p| Some(p.portfolio_stdev)),
        ("Benchmark stdev", |p| Some(p.benchmark_stdev)),
        ("Covariance", |p| Some(p.covariance)),
        ("Beta", |p| Some(p.beta)),
        ("Alpha", |p| Some(p.alpha)),
        ("Sharpe", |p| p.sharpe_ratio),
        ("Periods", |p| Some(p.periods as f64)),
    ];
    for (label, get) in rows {
        md.push_str(&format!(
            "| {label} | {} | {} |\n",
            cell(get(&m.monthly)),
            cell(a.and_then(get))
        ));
    }
    md
}

fn cell(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "n/a".into())
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a run under `{output_dir}/{name}_{timestamp}/`:
/// - `manifest.json`: the full `RunResult`
/// - `portfolio.csv`: bar-by-bar portfolio table
/// - `report.md`: human-readable summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        result.name,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("portfolio.csv"),
        export_portfolio_csv(&result.portfolio)?,
    )?;
    std::fs::write(run_dir.join("report.md"), render_markdown_report(result))?;

    Ok(run_dir)
}
