//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. VaR monotonicity — higher confidence never lowers historical VaR
//! 2. ES conservatism — expected shortfall is at least historical VaR
//! 3. Diversification — offsetting positions cut portfolio VaR below the
//!    standalone sum; perfectly correlated positions match it; partially
//!    correlated positions report a benefit even when the historical sample
//!    does not show one
//! 4. PnL identity — pnl = gross - commission, gross sign follows the move
//! 5. Range invariants — low <= point <= high, width > 0, fallback iff no ATR
//! 6. Simulation idempotence — simulate twice, identical output

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tradegate_core::domain::{Bar, Direction, PriceSeries, ReturnSeries, Side, Signal, Trade};
use tradegate_core::engine::{SimulationConfig, StopModel, TradeSimulator};
use tradegate_core::range::{RangeCalculator, RangeConfig, RangeSource};
use tradegate_core::risk::{Exposure, RiskConfig, RiskEngine, VarMethod};

const CAPITAL: f64 = 100_000.0;

fn engine() -> RiskEngine {
    RiskEngine::new(CAPITAL, RiskConfig::default()).unwrap()
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

fn to_series(values: &[f64]) -> ReturnSeries {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (start() + Duration::days(i as i64), *v))
        .collect()
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.1..0.1_f64, 30..120)
}

/// Returns with at least two clear losses and two clear gains.
fn arb_two_sided_returns() -> impl Strategy<Value = Vec<f64>> {
    arb_returns().prop_map(|mut v| {
        v.extend([-0.05, -0.04, 0.04, 0.05]);
        v
    })
}

/// `(a, b)` with `b = 0.5 * a + noise`. The fixed tail keeps `b` from being
/// an exact linear function of `a`.
fn arb_partially_correlated() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    prop::collection::vec((-0.1..0.1_f64, -0.05..0.05_f64), 30..120).prop_map(|pairs| {
        let mut a: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
        let mut noise: Vec<f64> = pairs.iter().map(|(_, n)| *n).collect();
        a.extend([-0.05, -0.04, 0.04, 0.05]);
        noise.extend([0.03, -0.03, 0.03, -0.03]);
        let b: Vec<f64> = a.iter().zip(&noise).map(|(x, n)| 0.5 * x + n).collect();
        (a, b)
    })
}

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Long), Just(Side::Short)]
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Short), Just(Direction::Flat), Just(Direction::Long)]
}

// ── 1. VaR Monotonicity ──────────────────────────────────────────────

proptest! {
    #[test]
    fn var_non_decreasing_in_confidence(
        returns in arb_returns(),
        c1 in 0.5..0.98_f64,
        gap in 0.0..0.019_f64,
    ) {
        let c2 = c1 + gap;
        let e = engine();
        let v1 = e.var_historical(&returns, c1).unwrap().var_amount;
        let v2 = e.var_historical(&returns, c2).unwrap().var_amount;
        prop_assert!(v1 <= v2, "VaR({c1})={v1} > VaR({c2})={v2}");
    }
}

// ── 2. ES >= VaR ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn expected_shortfall_at_least_var(
        returns in arb_two_sided_returns(),
        c in 0.8..0.99_f64,
    ) {
        let r = engine().expected_shortfall(&returns, c).unwrap();
        let es = r.es_amount.unwrap();
        prop_assert!(es + 1e-9 >= r.var_amount, "ES {es} < VaR {}", r.var_amount);
    }
}

// ── 3. Diversification ───────────────────────────────────────────────

proptest! {
    #[test]
    fn offsetting_positions_diversify(
        returns in arb_two_sided_returns(),
        notional in 1_000.0..100_000.0_f64,
    ) {
        let mirrored: Vec<f64> = returns.iter().map(|r| -r).collect();
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), to_series(&returns));
        input.insert("B".to_string(), to_series(&mirrored));
        let positions = [Exposure::new("A", notional), Exposure::new("B", notional)];

        let e = engine();
        let pv = e.portfolio_var(&positions, &input, 0.95).unwrap().var_amount;
        let sum = e.standalone_var_sum(&positions, &input, 0.95).unwrap();
        prop_assert!(pv < sum, "portfolio {pv} not below standalone sum {sum}");
    }

    #[test]
    fn fully_correlated_positions_add_up(
        returns in arb_two_sided_returns(),
        scale in 0.5..3.0_f64,
        na in 1_000.0..50_000.0_f64,
        nb in 1_000.0..50_000.0_f64,
    ) {
        let scaled: Vec<f64> = returns.iter().map(|r| r * scale).collect();
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), to_series(&returns));
        input.insert("B".to_string(), to_series(&scaled));
        let positions = [Exposure::new("A", na), Exposure::new("B", nb)];

        let e = engine();
        let pv = e.portfolio_var(&positions, &input, 0.95).unwrap().var_amount;
        let sum = e.standalone_var_sum(&positions, &input, 0.95).unwrap();
        prop_assert!((pv - sum).abs() <= 1e-9 * sum.max(1.0));
    }

    #[test]
    fn partially_correlated_positions_diversify(
        (a, b) in arb_partially_correlated(),
        notional in 10_000.0..100_000.0_f64,
    ) {
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), to_series(&a));
        input.insert("B".to_string(), to_series(&b));
        let positions = [Exposure::new("A", notional), Exposure::new("B", notional)];

        let d = engine().diversification(&positions, &input, 0.95).unwrap();
        prop_assert!(
            d.portfolio_var < d.standalone_sum,
            "{:?} portfolio {} not below standalone sum {}",
            d.method,
            d.portfolio_var,
            d.standalone_sum
        );
        if d.method == VarMethod::Historical {
            let pv = engine().portfolio_var(&positions, &input, 0.95).unwrap().var_amount;
            prop_assert_eq!(pv, d.portfolio_var);
        }
    }
}

// ── 4. PnL Identity ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn pnl_is_gross_minus_commission(
        entry in arb_price(),
        exit in arb_price(),
        qty in 1.0..1_000.0_f64,
        side in arb_side(),
        commission_pct in 0.0..0.01_f64,
    ) {
        let mut t = Trade::open("SPY", "test", side, start(), entry, qty, 1.0, 0.0);
        t.close(start() + Duration::days(1), exit, 0.0, commission_pct, false);

        prop_assert!((t.pnl - (t.gross_pnl - t.commission)).abs() < 1e-9);
        let favourable = (exit - entry) * side.sign();
        if favourable > 0.0 {
            prop_assert!(t.gross_pnl > 0.0);
        } else if favourable < 0.0 {
            prop_assert!(t.gross_pnl < 0.0);
        } else {
            prop_assert_eq!(t.gross_pnl, 0.0);
        }
    }
}

// ── 5. Range Invariants ──────────────────────────────────────────────

proptest! {
    #[test]
    fn band_brackets_point(
        point in 1.0..1_000.0_f64,
        atr in 0.01..50.0_f64,
        multiplier in 0.1..5.0_f64,
        dir in arb_direction(),
    ) {
        let calc = RangeCalculator::new(RangeConfig::default()).unwrap();
        let r = calc.band(point, dir, Some(atr), multiplier).unwrap();
        prop_assert!(r.low <= r.point && r.point <= r.high);
        prop_assert!(r.width_pct > 0.0);
        prop_assert_eq!(r.source, RangeSource::Volatility);

        let fallback = calc.band(point, dir, None, multiplier).unwrap();
        prop_assert_eq!(fallback.source, RangeSource::Fallback);
        prop_assert!(fallback.low <= point && point <= fallback.high);
        prop_assert!(fallback.width_pct > 0.0);
    }
}

// ── 6. Simulation Idempotence ────────────────────────────────────────

fn walk(steps: &[f64]) -> Vec<Bar> {
    let mut close: f64 = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let open = close;
            close = (close * (1.0 + step)).max(1.0);
            Bar {
                timestamp: start() + Duration::days(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn simulate_is_deterministic(
        steps in prop::collection::vec(-0.03..0.03_f64, 20..80),
        dirs in prop::collection::vec(arb_direction(), 80),
    ) {
        let bars = walk(&steps);
        let signals: Vec<Signal> = bars
            .iter()
            .zip(&dirs)
            .map(|(b, d)| Signal::new(b.timestamp, *d, 1.0))
            .collect();
        let series = PriceSeries::new("SPY", bars).unwrap();
        let config = SimulationConfig {
            stop: StopModel::Fixed { distance: 2.0 },
            ..SimulationConfig::default()
        };
        let sim = TradeSimulator::new(config).unwrap();

        let a = sim.simulate("prop", &series, &signals).unwrap();
        let b = sim.simulate("prop", &series, &signals).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        prop_assert_eq!(a.equity_curve.len(), series.len());
        prop_assert!(a.trades.iter().all(|t| !t.is_open()));
    }
}
