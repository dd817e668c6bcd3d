//! End-to-end simulation behaviour for every policy variant.

use chrono::{Duration, NaiveDate};
use dcalab_core::{simulate, Bar, PriceSeries, PurchaseMode, PurchasePolicy};

// ── Helpers ──────────────────────────────────────────────────────────

fn series_from(opens_closes: &[(f64, f64)]) -> PriceSeries {
    let base = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    PriceSeries::new(
        opens_closes
            .iter()
            .enumerate()
            .map(|(i, &(o, c))| Bar::new(base + Duration::days(i as i64), o, c))
            .collect(),
    )
    .unwrap()
}

fn trending_series(n: usize) -> PriceSeries {
    let bars: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let close = 200.0 + (i as f64 * 0.07).sin() * 15.0 + i as f64 * 0.05;
            (close - 0.4, close)
        })
        .collect();
    series_from(&bars)
}

// ── Lump sum ─────────────────────────────────────────────────────────

#[test]
fn lump_sum_whole_units_leftover_cash_is_idle() {
    let prices = trending_series(300);
    let open0 = prices.first().unwrap().open;
    let capital = 10_000.0;
    let out = simulate(
        capital,
        &prices,
        &PurchasePolicy::lump_sum(PurchaseMode::WholeUnits),
    )
    .unwrap();

    let expected_units = (capital / open0).floor();
    let leftover = capital - expected_units * open0;

    assert_eq!(out.purchases().len(), 1);
    for s in out.states() {
        assert_eq!(s.units_held, expected_units);
        assert_eq!(s.cash_balance, leftover);
        assert_eq!(s.average_cost, open0);
    }
}

#[test]
fn lump_sum_fractional_deploys_all_capital() {
    let prices = trending_series(50);
    let open0 = prices.first().unwrap().open;
    let out = simulate(
        10_000.0,
        &prices,
        &PurchasePolicy::lump_sum(PurchaseMode::FractionalCash),
    )
    .unwrap();
    let last = out.final_state().unwrap();
    assert_eq!(last.cash_balance, 0.0);
    assert_eq!(last.units_held, 10_000.0 / open0);
}

#[test]
fn lump_sum_capital_below_price_never_buys() {
    let prices = series_from(&[(500.0, 510.0), (10.0, 10.0), (10.0, 10.0)]);
    let out = simulate(
        100.0,
        &prices,
        &PurchasePolicy::lump_sum(PurchaseMode::WholeUnits),
    )
    .unwrap();
    assert!(out.purchases().is_empty());
    assert!(out.states().all(|s| s.cash_balance == 100.0 && s.units_held == 0.0));
}

// ── DCA ──────────────────────────────────────────────────────────────

#[test]
fn dca_fractional_purchases_on_schedule() {
    let prices = trending_series(1_200);
    let out = simulate(
        1_000_000.0,
        &prices,
        &PurchasePolicy::dca(30, PurchaseMode::FractionalCash, 100.0),
    )
    .unwrap();

    let purchases = out.purchases();
    let indices: Vec<usize> = purchases.iter().map(|(i, _)| *i).collect();
    let expected: Vec<usize> = (0..1_200).step_by(30).collect();
    assert_eq!(indices, expected);

    let cash = out.cash_balances();
    for (k, (i, p)) in purchases.iter().enumerate() {
        assert_eq!(p.cost, 100.0);
        assert_eq!(cash[*i], 1_000_000.0 - 100.0 * (k as f64 + 1.0));
    }
}

#[test]
fn dca_fractional_final_partial_purchase_zeroes_cash() {
    let prices = trending_series(400);
    let out = simulate(
        1_050.0,
        &prices,
        &PurchasePolicy::dca(30, PurchaseMode::FractionalCash, 100.0),
    )
    .unwrap();

    let purchases = out.purchases();
    // Ten full lots then one partial lot of 50.
    assert_eq!(purchases.len(), 11);
    let (last_idx, last) = purchases.last().unwrap();
    assert_eq!(*last_idx, 300);
    assert_eq!(last.cost, 50.0);
    assert_eq!(out.snapshots()[300].state.cash_balance, 0.0);
    assert!(out.snapshots()[301..].iter().all(|s| s.purchase.is_none()));
    assert_eq!(out.final_state().unwrap().cash_balance, 0.0);
}

#[test]
fn dca_whole_units_buys_full_lots_then_remainder() {
    // Price fixed at 100: lot of 3 units costs 300.
    let prices = series_from(&vec![(100.0, 100.0); 10]);
    let out = simulate(
        1_000.0,
        &prices,
        &PurchasePolicy::dca(2, PurchaseMode::WholeUnits, 3.0),
    )
    .unwrap();
    let units: Vec<f64> = out.purchases().iter().map(|(_, p)| p.units).collect();
    // 300, 300, 300 then 1 unit from the remaining 100.
    assert_eq!(units, vec![3.0, 3.0, 3.0, 1.0]);
    assert_eq!(out.final_state().unwrap().cash_balance, 0.0);
    assert_eq!(out.final_state().unwrap().units_held, 10.0);
}

#[test]
fn dca_whole_units_fractional_remainder_stays_as_cash() {
    let prices = series_from(&vec![(30.0, 30.0); 6]);
    let out = simulate(
        100.0,
        &prices,
        &PurchasePolicy::dca(1, PurchaseMode::WholeUnits, 2.0),
    )
    .unwrap();
    // 60 for 2 units, then 1 unit for 30, then 10 idle forever.
    assert_eq!(out.final_state().unwrap().cash_balance, 10.0);
    assert_eq!(out.final_state().unwrap().units_held, 3.0);
}

// ── Invariants across every policy ───────────────────────────────────

fn all_policies() -> Vec<PurchasePolicy> {
    vec![
        PurchasePolicy::lump_sum(PurchaseMode::WholeUnits),
        PurchasePolicy::lump_sum(PurchaseMode::FractionalCash),
        PurchasePolicy::dca(7, PurchaseMode::WholeUnits, 2.0),
        PurchasePolicy::dca(21, PurchaseMode::FractionalCash, 750.0),
    ]
}

#[test]
fn every_policy_keeps_series_aligned() {
    let prices = trending_series(500);
    for policy in all_policies() {
        let out = simulate(25_000.0, &prices, &policy).unwrap();
        assert_eq!(out.len(), prices.len(), "{}", policy.describe());
        assert!(out.dates().eq(prices.dates()));
        for (snap, bar) in out.snapshots().iter().zip(prices.iter()) {
            assert_eq!(&snap.bar, bar);
        }
    }
}

#[test]
fn every_policy_cash_is_non_increasing() {
    let prices = trending_series(500);
    for policy in all_policies() {
        let cash = simulate(25_000.0, &prices, &policy).unwrap().cash_balances();
        assert!(
            cash.windows(2).all(|w| w[1] <= w[0]),
            "cash increased under {}",
            policy.describe()
        );
        assert!(cash.iter().all(|c| *c >= 0.0));
    }
}

#[test]
fn every_policy_average_cost_only_moves_on_purchases() {
    let prices = trending_series(500);
    for policy in all_policies() {
        let out = simulate(25_000.0, &prices, &policy).unwrap();
        let snaps = out.snapshots();
        for i in 1..snaps.len() {
            let prev = snaps[i - 1].state;
            let cur = snaps[i].state;
            match snaps[i].purchase {
                None => assert_eq!(cur.average_cost, prev.average_cost),
                Some(p) => {
                    let expected = (prev.average_cost * prev.units_held + p.price * p.units)
                        / (prev.units_held + p.units);
                    assert_eq!(cur.average_cost, expected);
                    assert_eq!(cur.units_held, prev.units_held + p.units);
                }
            }
        }
    }
}

#[test]
fn every_policy_unrealized_pnl_is_exact() {
    let prices = trending_series(500);
    for policy in all_policies() {
        let out = simulate(25_000.0, &prices, &policy).unwrap();
        for snap in out.snapshots() {
            let s = snap.state;
            assert_eq!(s.unrealized_pnl, (snap.bar.close - s.average_cost) * s.units_held);
        }
    }
}

#[test]
fn input_series_is_not_mutated() {
    let prices = trending_series(100);
    let before = prices.clone();
    let _ = simulate(
        5_000.0,
        &prices,
        &PurchasePolicy::dca(5, PurchaseMode::FractionalCash, 100.0),
    )
    .unwrap();
    assert_eq!(prices, before);
}

#[test]
fn simulation_is_deterministic() {
    let prices = trending_series(200);
    let policy = PurchasePolicy::dca(10, PurchaseMode::WholeUnits, 1.0);
    let a = simulate(5_000.0, &prices, &policy).unwrap();
    let b = simulate(5_000.0, &prices, &policy).unwrap();
    assert_eq!(a, b);
}
