//! Portfolio state and the per-bar series the simulator produces.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::Bar;

/// Running state of a single-instrument, long-only portfolio.
///
/// `average_cost` is 0 while nothing is held. It only changes when a
/// purchase is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash_balance: f64,
    pub units_held: f64,
    pub average_cost: f64,
    pub unrealized_pnl: f64,
}

impl PortfolioState {
    pub fn new(cash_balance: f64) -> Self {
        Self {
            cash_balance,
            ..Self::default()
        }
    }

    /// Fold a purchase into the state: weighted-average cost, units, cash.
    ///
    /// A purchase of zero units leaves the state untouched.
    pub fn apply_purchase(self, purchase: &Purchase) -> Self {
        let total_units = self.units_held + purchase.units;
        if purchase.units <= 0.0 || total_units <= 0.0 {
            return self;
        }
        let average_cost = (self.average_cost * self.units_held + purchase.price * purchase.units)
            / total_units;
        Self {
            cash_balance: self.cash_balance - purchase.cost,
            units_held: total_units,
            average_cost,
            unrealized_pnl: self.unrealized_pnl,
        }
    }

    /// Revalue against a closing price.
    pub fn mark(self, close: f64) -> Self {
        Self {
            unrealized_pnl: (close - self.average_cost) * self.units_held,
            ..self
        }
    }

    /// Capital tied up in held units at cost: `units * average_cost`.
    pub fn cost_basis(&self) -> f64 {
        self.units_held * self.average_cost
    }

    /// Cash plus held units valued at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.cash_balance + self.units_held * price
    }
}

/// A single fill executed at a bar's open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub units: f64,
    pub price: f64,
    /// Cash deducted for this fill.
    pub cost: f64,
}

/// State after processing one bar, with the bar it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub bar: Bar,
    pub state: PortfolioState,
    pub purchase: Option<Purchase>,
}

impl PortfolioSnapshot {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    /// Cash plus held units at this bar's close.
    pub fn market_value(&self) -> f64 {
        self.state.market_value(self.bar.close)
    }
}

/// One snapshot per input bar, in the same date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSeries {
    starting_capital: f64,
    snapshots: Vec<PortfolioSnapshot>,
}

impl PortfolioSeries {
    pub fn from_snapshots(starting_capital: f64, snapshots: Vec<PortfolioSnapshot>) -> Self {
        Self {
            starting_capital,
            snapshots,
        }
    }

    pub fn starting_capital(&self) -> f64 {
        self.starting_capital
    }

    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn first(&self) -> Option<&PortfolioSnapshot> {
        self.snapshots.first()
    }

    pub fn last(&self) -> Option<&PortfolioSnapshot> {
        self.snapshots.last()
    }

    pub fn final_state(&self) -> Option<PortfolioState> {
        self.snapshots.last().map(|s| s.state)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.snapshots.iter().map(|s| s.bar.date)
    }

    pub fn states(&self) -> impl Iterator<Item = &PortfolioState> + '_ {
        self.snapshots.iter().map(|s| &s.state)
    }

    /// Bar index and fill of every executed purchase.
    pub fn purchases(&self) -> Vec<(usize, Purchase)> {
        self.snapshots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.purchase.map(|p| (i, p)))
            .collect()
    }

    pub fn unrealized_pnl(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.state.unrealized_pnl).collect()
    }

    pub fn cash_balances(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.state.cash_balance).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_purchase_sets_average_to_price() {
        let s = PortfolioState::new(1_000.0).apply_purchase(&Purchase {
            units: 4.0,
            price: 50.0,
            cost: 200.0,
        });
        assert_eq!(s.units_held, 4.0);
        assert_eq!(s.average_cost, 50.0);
        assert_eq!(s.cash_balance, 800.0);
    }

    #[test]
    fn average_cost_is_unit_weighted() {
        let s = PortfolioState::new(10_000.0)
            .apply_purchase(&Purchase {
                units: 10.0,
                price: 100.0,
                cost: 1_000.0,
            })
            .apply_purchase(&Purchase {
                units: 30.0,
                price: 200.0,
                cost: 6_000.0,
            });
        // (10*100 + 30*200) / 40 = 175
        assert_eq!(s.average_cost, 175.0);
        assert_eq!(s.units_held, 40.0);
        assert_eq!(s.cash_balance, 3_000.0);
    }

    #[test]
    fn zero_unit_purchase_is_noop() {
        let s = PortfolioState::new(10.0);
        let after = s.apply_purchase(&Purchase {
            units: 0.0,
            price: 100.0,
            cost: 0.0,
        });
        assert_eq!(s, after);
        assert_eq!(after.average_cost, 0.0);
    }

    #[test]
    fn mark_computes_unrealized_pnl() {
        let s = PortfolioState {
            cash_balance: 0.0,
            units_held: 10.0,
            average_cost: 100.0,
            unrealized_pnl: 0.0,
        }
        .mark(110.0);
        assert_eq!(s.unrealized_pnl, 100.0);
        assert_eq!(s.cost_basis(), 1_000.0);
        assert_eq!(s.market_value(110.0), 1_100.0);
    }

    #[test]
    fn flat_state_marks_to_zero() {
        let s = PortfolioState::new(500.0).mark(123.0);
        assert_eq!(s.unrealized_pnl, 0.0);
        assert_eq!(s.units_held, 0.0);
    }
}
