//! DcaLab CLI: single runs, DCA sweeps, and synthetic price data.
//!
//! Commands:
//! - `run`: simulate one policy from a TOML config file or from flags
//! - `sweep`: evaluate a grid of DCA intervals and lot sizes in parallel
//! - `synth`: write a seeded random-walk price CSV

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use dcalab_core::{PurchaseMode, PurchasePolicy};
use dcalab_runner::config::RunSection;
use dcalab_runner::{
    export_sweep_csv, load_price_csv, run_from_config, run_sweep, save_artifacts,
    synthetic_series, write_price_csv, MetricsCalculator, PeriodMetrics, PeriodValuation, RunConfig,
    RunResult, SweepGrid,
};

#[derive(Parser)]
#[command(
    name = "dcalab",
    about = "DcaLab CLI: lump-sum vs dollar-cost-averaging simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one policy and write the artifact bundle.
    Run {
        /// Path to a TOML config file. Excludes the policy flags below.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Price CSV (Date, Open, Close).
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Benchmark CSV. Defaults to --prices.
        #[arg(long)]
        benchmark: Option<PathBuf>,

        /// Starting capital.
        #[arg(long)]
        capital: Option<f64>,

        #[arg(long, value_enum, default_value_t = PolicyArg::Dca)]
        policy: PolicyArg,

        /// Bars between DCA purchases.
        #[arg(long, default_value_t = 30)]
        interval: u32,

        /// Units per purchase (whole-units) or cash per purchase (fractional-cash).
        #[arg(long, default_value_t = 100.0)]
        lot_size: f64,

        #[arg(long, value_enum, default_value_t = ModeArg::FractionalCash)]
        mode: ModeArg,

        /// Risk-free rate used by alpha and Sharpe.
        #[arg(long, default_value_t = 0.0)]
        risk_free: f64,

        #[arg(long, value_enum, default_value_t = ValuationArg::CostBasis)]
        valuation: ValuationArg,

        /// Run name used for the artifact directory.
        #[arg(long, default_value = "run")]
        name: String,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Evaluate a grid of DCA policies against one price series.
    Sweep {
        #[arg(long)]
        prices: PathBuf,

        #[arg(long)]
        benchmark: Option<PathBuf>,

        #[arg(long)]
        capital: f64,

        /// Comma-separated purchase intervals in bars.
        #[arg(long, value_delimiter = ',', default_values_t = [5, 21, 63])]
        intervals: Vec<u32>,

        /// Comma-separated lot sizes.
        #[arg(long, value_delimiter = ',', default_values_t = [100.0])]
        lot_sizes: Vec<f64>,

        #[arg(long, value_enum, default_value_t = ModeArg::FractionalCash)]
        mode: ModeArg,

        /// Skip the lump-sum baseline row.
        #[arg(long, default_value_t = false)]
        no_lump_sum: bool,

        #[arg(long, default_value_t = 0.0)]
        risk_free: f64,

        #[arg(long, value_enum, default_value_t = ValuationArg::CostBasis)]
        valuation: ValuationArg,

        /// Write the ranked table as CSV here instead of printing it.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a synthetic weekday price series.
    Synth {
        /// Number of bars.
        #[arg(long, default_value_t = 2520)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2015-01-01")]
        start: String,

        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    LumpSum,
    Dca,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    WholeUnits,
    FractionalCash,
}

impl From<ModeArg> for PurchaseMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::WholeUnits => PurchaseMode::WholeUnits,
            ModeArg::FractionalCash => PurchaseMode::FractionalCash,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ValuationArg {
    CostBasis,
    MarketValue,
}

impl From<ValuationArg> for PeriodValuation {
    fn from(v: ValuationArg) -> Self {
        match v {
            ValuationArg::CostBasis => PeriodValuation::CostBasis,
            ValuationArg::MarketValue => PeriodValuation::MarketValue,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            prices,
            benchmark,
            capital,
            policy,
            interval,
            lot_size,
            mode,
            risk_free,
            valuation,
            name,
            output_dir,
        } => {
            let run_config = match (config, prices) {
                (Some(_), Some(_)) => bail!("--config and --prices are mutually exclusive"),
                (None, None) => bail!("one of --config or --prices is required"),
                (Some(path), None) => RunConfig::from_file(&path)?,
                (None, Some(prices)) => {
                    let Some(starting_capital) = capital else {
                        bail!("--capital is required with --prices");
                    };
                    let policy = match policy {
                        PolicyArg::LumpSum => PurchasePolicy::lump_sum(mode.into()),
                        PolicyArg::Dca => PurchasePolicy::dca(interval, mode.into(), lot_size),
                    };
                    let config = RunConfig {
                        run: RunSection {
                            name,
                            prices,
                            benchmark,
                            starting_capital,
                            risk_free_rate: risk_free,
                            valuation: valuation.into(),
                        },
                        policy,
                    };
                    config.validate()?;
                    config
                }
            };
            run_cmd(&run_config, &output_dir)
        }
        Commands::Sweep {
            prices,
            benchmark,
            capital,
            intervals,
            lot_sizes,
            mode,
            no_lump_sum,
            risk_free,
            valuation,
            output,
        } => {
            let grid = SweepGrid {
                interval_days: intervals,
                lot_sizes,
                modes: vec![mode.into()],
                include_lump_sum: !no_lump_sum,
            };
            let calculator = MetricsCalculator::new(risk_free, valuation.into());
            sweep_cmd(
                &grid,
                capital,
                &prices,
                benchmark.as_deref(),
                &calculator,
                output.as_deref(),
            )
        }
        Commands::Synth {
            days,
            seed,
            start,
            output,
        } => synth_cmd(days, seed, &start, &output),
    }
}

fn run_cmd(config: &RunConfig, output_dir: &Path) -> Result<()> {
    let result = run_from_config(config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn sweep_cmd(
    grid: &SweepGrid,
    capital: f64,
    prices_path: &Path,
    benchmark_path: Option<&Path>,
    calculator: &MetricsCalculator,
    output: Option<&Path>,
) -> Result<()> {
    if grid.size() == 0 {
        bail!("sweep grid is empty");
    }
    let prices = load_price_csv(prices_path)?;
    let benchmark = match benchmark_path {
        Some(path) => load_price_csv(path)?,
        None => prices.clone(),
    };

    let entries = run_sweep(grid, capital, &prices, &benchmark, calculator);

    if let Some(path) = output {
        std::fs::write(path, export_sweep_csv(&entries)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Sweep of {} policies saved to: {}", entries.len(), path.display());
        return Ok(());
    }

    println!();
    println!(
        "{:<32} {:>14} {:>12} {:>10} {:>10} {:>10}",
        "Policy", "Final P&L", "Idle Cash", "Return", "Beta (m)", "Sharpe (m)"
    );
    println!("{}", "-".repeat(93));
    for entry in &entries {
        match &entry.outcome {
            Ok(s) => println!(
                "{:<32} {:>14.2} {:>12.2} {:>9.2}% {:>10.3} {:>10}",
                entry.policy.describe(),
                s.final_pnl,
                s.final_cash,
                s.total_return * 100.0,
                s.monthly_beta,
                s.monthly_sharpe
                    .map(|v| format!("{v:.3}"))
                    .unwrap_or_else(|| "n/a".into()),
            ),
            Err(msg) => {
                warn!(policy = %entry.policy.describe(), error = %msg, "sweep point failed");
                println!("{:<32} error: {msg}", entry.policy.describe());
            }
        }
    }
    Ok(())
}

fn synth_cmd(days: usize, seed: u64, start: &str, output: &Path) -> Result<()> {
    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}' (expected YYYY-MM-DD)"))?;
    let series = synthetic_series(start_date, days, seed);
    let file = std::fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    write_price_csv(&series, file)?;
    println!(
        "Wrote {} synthetic bars (seed {seed}) to {}",
        series.len(),
        output.display()
    );
    Ok(())
}

fn print_summary(result: &RunResult) {
    print!("{}", render_summary(result));
}

fn render_summary(result: &RunResult) -> String {
    let state = &result.final_state;
    let m = &result.metrics;
    let opt = |v: Option<f64>| v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "n/a".into());

    let mut out = String::new();
    out.push_str("\n=== Simulation Result ===\n");
    out.push_str(&format!("Name:           {}\n", result.name));
    out.push_str(&format!("Policy:         {}\n", result.policy.describe()));
    out.push_str(&format!(
        "Period:         {} to {}\n",
        result.start_date, result.end_date
    ));
    out.push_str(&format!("Bars:           {}\n", result.bar_count));
    out.push_str(&format!("Purchases:      {}\n", result.purchase_count));
    out.push_str("\n--- Portfolio ---\n");
    out.push_str(&format!("Capital:        {:.2}\n", result.starting_capital));
    out.push_str(&format!("Units Held:     {:.6}\n", state.units_held));
    out.push_str(&format!("Average Cost:   {:.4}\n", state.average_cost));
    out.push_str(&format!("Idle Cash:      {:.2}\n", state.cash_balance));
    out.push_str(&format!("Unrealized P&L: {:.2}\n", state.unrealized_pnl));
    out.push_str(&format!("\n--- Metrics ({:?}) ---\n", m.valuation));
    out.push_str(&format!(
        "Total Return:   {:.2}%\n",
        m.total_portfolio_return * 100.0
    ));
    out.push_str(&format!(
        "Benchmark:      {:.2}%\n",
        m.total_benchmark_return * 100.0
    ));
    out.push_str(&format!("Max Drawdown:   {:.2}\n", m.max_drawdown));
    out.push_str(&format!(
        "{:<15} {:>10} {:>10}\n",
        "", "Monthly", "Annual"
    ));
    let a = m.annual.as_ref();
    let rows: [(&str, fn(&PeriodMetrics) -> Option<f64>); 5] = [
        ("Stdev", |p| Some(p.portfolio_stdev)),
        ("Bench Stdev", |p| Some(p.benchmark_stdev)),
        ("Beta", |p| Some(p.beta)),
        ("Alpha", |p| Some(p.alpha)),
        ("Sharpe", |p| p.sharpe_ratio),
    ];
    for (label, get) in rows {
        out.push_str(&format!(
            "{:<15} {:>10} {:>10}\n",
            format!("{label}:"),
            opt(get(&m.monthly)),
            opt(a.and_then(get))
        ));
    }
    if a.is_none() {
        out.push_str("Annual metrics need at least two calendar years.\n");
    }
    out.push('\n');
    out
}
