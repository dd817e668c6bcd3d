//! DcaLab Core: price series, purchase policies and the portfolio simulator.
//!
//! This crate contains the simulation engine:
//! - Domain types (bars, price series, portfolio state and snapshots)
//! - Purchase policies (lump sum, dollar-cost averaging) in whole-unit or
//!   fractional-cash mode
//! - A pure per-bar `step` transition and the `simulate` fold over a series

pub mod domain;
pub mod engine;

pub use domain::{
    Bar, PortfolioSeries, PortfolioSnapshot, PortfolioState, PriceSeries, Purchase, PurchaseMode,
    PurchasePolicy, SeriesError,
};
pub use engine::{simulate, step, SimulationError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types can cross thread boundaries, so
    /// parameter sweeps can run simulations on worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<PurchasePolicy>();
        require_sync::<PurchasePolicy>();
        require_send::<PortfolioState>();
        require_sync::<PortfolioState>();
        require_send::<PortfolioSeries>();
        require_sync::<PortfolioSeries>();
        require_send::<SimulationError>();
        require_sync::<SimulationError>();
    }
}
