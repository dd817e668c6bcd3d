//! Simulation engine: per-bar `step` and the whole-series `simulate` fold.

pub mod error;
pub mod simulate;
pub mod step;

pub use error::SimulationError;
pub use simulate::{simulate, validate_inputs, validate_policy};
pub use step::{size_purchase, step};
