//! Domain types for DcaLab

pub mod bar;
pub mod policy;
pub mod portfolio;

pub use bar::{Bar, PriceSeries, SeriesError};
pub use policy::{PurchaseMode, PurchasePolicy};
pub use portfolio::{PortfolioSeries, PortfolioSnapshot, PortfolioState, Purchase};
