//! Input validation errors raised before any simulation step runs.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid input: starting capital must be positive, got {0}")]
    NonPositiveCapital(f64),

    #[error("invalid input: price series is empty")]
    EmptySeries,

    #[error("invalid input: non-positive {field} price {value} on {date} (bar {index})")]
    NonPositivePrice {
        index: usize,
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("invalid input: DCA interval must be at least one bar")]
    ZeroInterval,

    #[error("invalid input: lot size must be positive, got {0}")]
    NonPositiveLotSize(f64),

    #[error("invalid input: whole-unit lot size must be a whole number, got {0}")]
    FractionalLotSize(f64),
}
