//! Whole-series simulation: validate inputs, then fold `step` over the bars.

use crate::domain::{
    PortfolioSeries, PortfolioSnapshot, PortfolioState, PriceSeries, PurchaseMode, PurchasePolicy,
};

use super::error::SimulationError;
use super::step::step;

/// Simulate a purchase policy over a price series.
///
/// The returned series holds one snapshot per input bar, in the same order
/// and with copies of the same bars. The caller's `prices` is only borrowed.
pub fn simulate(
    starting_capital: f64,
    prices: &PriceSeries,
    policy: &PurchasePolicy,
) -> Result<PortfolioSeries, SimulationError> {
    validate_inputs(starting_capital, prices, policy)?;

    let mut state = PortfolioState::new(starting_capital);
    let mut snapshots = Vec::with_capacity(prices.len());

    for (index, bar) in prices.iter().enumerate() {
        let (next, purchase) = step(state, bar, index, policy);
        state = next;
        snapshots.push(PortfolioSnapshot {
            bar: *bar,
            state,
            purchase,
        });
    }

    Ok(PortfolioSeries::from_snapshots(starting_capital, snapshots))
}

/// Fail-fast checks run before the first bar is processed.
pub fn validate_inputs(
    starting_capital: f64,
    prices: &PriceSeries,
    policy: &PurchasePolicy,
) -> Result<(), SimulationError> {
    if !(starting_capital.is_finite() && starting_capital > 0.0) {
        return Err(SimulationError::NonPositiveCapital(starting_capital));
    }
    validate_policy(policy)?;
    if prices.is_empty() {
        return Err(SimulationError::EmptySeries);
    }
    if let Some((index, bar)) = prices
        .iter()
        .enumerate()
        .find(|(_, bar)| !bar.has_positive_prices())
    {
        let (field, value) = if bar.open.is_finite() && bar.open > 0.0 {
            ("close", bar.close)
        } else {
            ("open", bar.open)
        };
        return Err(SimulationError::NonPositivePrice {
            index,
            date: bar.date,
            field,
            value,
        });
    }
    Ok(())
}

pub fn validate_policy(policy: &PurchasePolicy) -> Result<(), SimulationError> {
    match *policy {
        PurchasePolicy::LumpSum { .. } => Ok(()),
        PurchasePolicy::Dca {
            interval_days,
            mode,
            lot_size,
        } => {
            if interval_days == 0 {
                return Err(SimulationError::ZeroInterval);
            }
            if !(lot_size.is_finite() && lot_size > 0.0) {
                return Err(SimulationError::NonPositiveLotSize(lot_size));
            }
            if mode == PurchaseMode::WholeUnits && lot_size.fract() != 0.0 {
                return Err(SimulationError::FractionalLotSize(lot_size));
            }
            Ok(())
        }
    }
}
