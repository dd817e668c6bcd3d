//! Purchase policies: when to buy and how much.

use serde::{Deserialize, Serialize};

/// How a purchase quantity is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseMode {
    /// Buy whole units only; leftover cash stays idle.
    WholeUnits,
    /// Spend a cash amount and receive fractional units.
    FractionalCash,
}

impl PurchaseMode {
    pub fn label(&self) -> &'static str {
        match self {
            PurchaseMode::WholeUnits => "whole_units",
            PurchaseMode::FractionalCash => "fractional_cash",
        }
    }
}

/// Purchase policy, fixed for the length of a run.
///
/// `Dca::lot_size` is a unit count under `WholeUnits` and a cash amount under
/// `FractionalCash`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PurchasePolicy {
    /// Deploy capital once, at the open of the first bar.
    LumpSum { mode: PurchaseMode },

    /// Buy on bar 0 and on every bar whose index is a multiple of `interval_days`.
    Dca {
        interval_days: u32,
        mode: PurchaseMode,
        lot_size: f64,
    },
}

impl PurchasePolicy {
    pub fn lump_sum(mode: PurchaseMode) -> Self {
        PurchasePolicy::LumpSum { mode }
    }

    pub fn dca(interval_days: u32, mode: PurchaseMode, lot_size: f64) -> Self {
        PurchasePolicy::Dca {
            interval_days,
            mode,
            lot_size,
        }
    }

    pub fn mode(&self) -> PurchaseMode {
        match self {
            PurchasePolicy::LumpSum { mode } | PurchasePolicy::Dca { mode, .. } => *mode,
        }
    }

    /// Whether the policy schedules a purchase attempt on bar `index`.
    pub fn is_purchase_bar(&self, index: usize) -> bool {
        match self {
            PurchasePolicy::LumpSum { .. } => index == 0,
            PurchasePolicy::Dca { interval_days, .. } => {
                *interval_days > 0 && index % *interval_days as usize == 0
            }
        }
    }

    /// Short human-readable description, e.g. `dca/30d/fractional_cash/100`.
    pub fn describe(&self) -> String {
        match self {
            PurchasePolicy::LumpSum { mode } => format!("lump_sum/{}", mode.label()),
            PurchasePolicy::Dca {
                interval_days,
                mode,
                lot_size,
            } => format!("dca/{interval_days}d/{}/{lot_size}", mode.label()),
        }
    }
}
