//! DcaLab Runner: run orchestration, metrics, sweeps and export.
//!
//! This crate builds on `dcalab-core` to provide:
//! - Price CSV loading and seeded synthetic series
//! - TOML run configuration with content-addressed run ids
//! - Monthly/annual return segmentation, volatility, beta, alpha, Sharpe, drawdown
//! - Single-run orchestration and parallel parameter sweeps
//! - JSON, CSV and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{load_price_csv, read_price_csv, synthetic_series, write_price_csv, LoadError};
pub use export::{
    export_json, export_portfolio_csv, export_sweep_csv, import_json, render_markdown_report,
    save_artifacts,
};
pub use metrics::{
    compute, Granularity, MetricsCalculator, MetricsError, MetricsReport, PeriodMetrics,
    PeriodValuation, ReturnSeries,
};
pub use runner::{run_from_config, run_with_series, RunError, RunResult};
pub use sweep::{run_sweep, SweepEntry, SweepGrid, SweepSummary};
