//! Per-bar state transition.
//!
//! `step` is pure: it takes the state after bar `index - 1` and returns the
//! state after bar `index`, together with the fill executed on that bar.
//! Purchases fill at the bar's open; valuation uses the bar's close.

use crate::domain::{Bar, PortfolioState, Purchase, PurchaseMode, PurchasePolicy};

/// Advance the portfolio by one bar.
pub fn step(
    state: PortfolioState,
    bar: &Bar,
    index: usize,
    policy: &PurchasePolicy,
) -> (PortfolioState, Option<Purchase>) {
    let purchase = if policy.is_purchase_bar(index) && state.cash_balance > 0.0 {
        size_purchase(state.cash_balance, bar.open, policy)
    } else {
        None
    };

    let state = match &purchase {
        Some(p) => state.apply_purchase(p),
        None => state,
    };
    (state.mark(bar.close), purchase)
}

/// Work out the fill for a scheduled purchase given the available cash.
///
/// Returns `None` when nothing is affordable.
pub fn size_purchase(cash: f64, open: f64, policy: &PurchasePolicy) -> Option<Purchase> {
    if cash <= 0.0 || open <= 0.0 {
        return None;
    }
    match *policy {
        PurchasePolicy::LumpSum {
            mode: PurchaseMode::WholeUnits,
        } => whole_units_affordable(cash, open),

        PurchasePolicy::LumpSum {
            mode: PurchaseMode::FractionalCash,
        } => Some(Purchase {
            units: cash / open,
            price: open,
            cost: cash,
        }),

        PurchasePolicy::Dca {
            mode: PurchaseMode::WholeUnits,
            lot_size,
            ..
        } => {
            let lot_cost = open * lot_size;
            if cash >= lot_cost {
                Some(Purchase {
                    units: lot_size,
                    price: open,
                    cost: lot_cost,
                })
            } else {
                whole_units_affordable(cash, open)
            }
        }

        // Units received = cash spent / price.
        PurchasePolicy::Dca {
            mode: PurchaseMode::FractionalCash,
            lot_size,
            ..
        } => {
            let spend = if cash >= lot_size { lot_size } else { cash };
            Some(Purchase {
                units: spend / open,
                price: open,
                cost: spend,
            })
        }
    }
}

/// Largest whole-unit lot that `cash` covers at `price`.
fn whole_units_affordable(cash: f64, price: f64) -> Option<Purchase> {
    let mut units = (cash / price).floor();
    // cash / price can round up onto an integer the cash does not cover.
    if units * price > cash {
        units -= 1.0;
    }
    if units < 1.0 {
        return None;
    }
    Some(Purchase {
        units,
        price,
        cost: units * price,
    })
}
