//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [run]
//! name = "spy_dca"
//! prices = "data/SPY.csv"
//! starting_capital = 1000000.0
//! risk_free_rate = 0.0
//! valuation = "cost_basis"
//!
//! [policy]
//! type = "dca"
//! interval_days = 30
//! mode = "fractional_cash"
//! lot_size = 100.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dcalab_core::engine::{validate_policy, SimulationError};
use dcalab_core::PurchasePolicy;

use crate::metrics::{MetricsCalculator, PeriodValuation};

/// Content-addressable identifier for a run configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<SimulationError> for ConfigError {
    fn from(e: SimulationError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub run: RunSection,
    pub policy: PurchasePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSection {
    #[serde(default = "default_name")]
    pub name: String,

    /// Price CSV the policy is simulated against.
    pub prices: PathBuf,

    /// Benchmark price CSV. Defaults to `prices`.
    #[serde(default)]
    pub benchmark: Option<PathBuf>,

    pub starting_capital: f64,

    #[serde(default)]
    pub risk_free_rate: f64,

    #[serde(default)]
    pub valuation: PeriodValuation,
}

fn default_name() -> String {
    "run".into()
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.resolve_paths(path.parent().unwrap_or(Path::new(".")));
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject bad parameters before any data is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capital = self.run.starting_capital;
        if !(capital.is_finite() && capital > 0.0) {
            return Err(SimulationError::NonPositiveCapital(capital).into());
        }
        if !self.run.risk_free_rate.is_finite() {
            return Err(ConfigError::Invalid("risk_free_rate must be finite".into()));
        }
        validate_policy(&self.policy)?;
        Ok(())
    }

    pub fn benchmark_path(&self) -> &Path {
        self.run.benchmark.as_deref().unwrap_or(&self.run.prices)
    }

    pub fn metrics_calculator(&self) -> MetricsCalculator {
        MetricsCalculator::new(self.run.risk_free_rate, self.run.valuation)
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Make relative data paths relative to the config file's directory.
    fn resolve_paths(&mut self, base: &Path) {
        if self.run.prices.is_relative() {
            self.run.prices = base.join(&self.run.prices);
        }
        if let Some(b) = self.run.benchmark.as_mut() {
            if b.is_relative() {
                *b = base.join(&*b);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcalab_core::PurchaseMode;

    const DCA_TOML: &str = r#"
[run]
name = "spy_dca"
prices = "data/SPY.csv"
starting_capital = 1000000.0

[policy]
type = "dca"
interval_days = 30
mode = "fractional_cash"
lot_size = 100.0
"#;

    #[test]
    fn parses_dca_config_with_defaults() {
        let c = RunConfig::from_toml(DCA_TOML).unwrap();
        assert_eq!(c.run.name, "spy_dca");
        assert_eq!(c.run.risk_free_rate, 0.0);
        assert_eq!(c.run.valuation, PeriodValuation::CostBasis);
        assert_eq!(c.benchmark_path(), Path::new("data/SPY.csv"));
        assert_eq!(
            c.policy,
            PurchasePolicy::dca(30, PurchaseMode::FractionalCash, 100.0)
        );
    }

    #[test]
    fn parses_lump_sum_with_benchmark() {
        let c = RunConfig::from_toml(
            r#"
[run]
prices = "a.csv"
benchmark = "b.csv"
starting_capital = 5000
risk_free_rate = 0.02
valuation = "market_value"

[policy]
type = "lump_sum"
mode = "whole_units"
"#,
        )
        .unwrap();
        assert_eq!(c.run.name, "run");
        assert_eq!(c.benchmark_path(), Path::new("b.csv"));
        assert_eq!(c.run.valuation, PeriodValuation::MarketValue);
        assert_eq!(c.metrics_calculator().risk_free_rate, 0.02);
    }

    #[test]
    fn rejects_zero_interval() {
        let toml = DCA_TOML.replace("interval_days = 30", "interval_days = 0");
        assert!(matches!(
            RunConfig::from_toml(&toml).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn rejects_negative_interval_at_parse() {
        let toml = DCA_TOML.replace("interval_days = 30", "interval_days = -5");
        assert!(matches!(
            RunConfig::from_toml(&toml).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn rejects_non_positive_capital() {
        let toml = DCA_TOML.replace("1000000.0", "0.0");
        let err = RunConfig::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("starting capital"));
    }

    #[test]
    fn rejects_unknown_policy_type() {
        let toml = DCA_TOML.replace("type = \"dca\"", "type = \"martingale\"");
        assert!(RunConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn run_id_deterministic_and_param_sensitive() {
        let a = RunConfig::from_toml(DCA_TOML).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        b.policy = PurchasePolicy::dca(7, PurchaseMode::FractionalCash, 100.0);
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn toml_roundtrip() {
        let a = RunConfig::from_toml(DCA_TOML).unwrap();
        let b = RunConfig::from_toml(&a.to_toml().unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let mut c = RunConfig::from_toml(DCA_TOML).unwrap();
        c.resolve_paths(Path::new("/srv/runs"));
        assert_eq!(c.run.prices, PathBuf::from("/srv/runs/data/SPY.csv"));
    }
}
