//! Criterion benchmarks for Tradegate hot paths.
//!
//! Benchmarks:
//! 1. Trade simulator (full replay with a built-in strategy's signals)
//! 2. Historical VaR and Expected Shortfall
//! 3. Correlation matrix across several return series
//! 4. ATR precompute

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tradegate_core::domain::{Bar, PriceSeries, ReturnSeries};
use tradegate_core::engine::{SimulationConfig, TradeSimulator};
use tradegate_core::indicators::atr;
use tradegate_core::risk::{RiskConfig, RiskEngine};
use tradegate_core::strategy::{Strategy, MaCrossover};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize, phase: f64) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1 + phase).sin() * 10.0;
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

// ── 1. Simulator ─────────────────────────────────────────────────────

fn bench_simulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("trade_simulator");
    let sim = TradeSimulator::new(SimulationConfig::default()).unwrap();

    for &bar_count in &[252, 1260, 2520] {
        let series = PriceSeries::new("BENCH", make_bars(bar_count, 0.0)).unwrap();
        let params = MaCrossover.default_params();
        let signals = MaCrossover.compute(series.bars(), &params).unwrap();

        group.bench_with_input(
            BenchmarkId::new("ma_crossover", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| sim.simulate("ma_crossover", black_box(&series), black_box(&signals)));
            },
        );
    }
    group.finish();
}

// ── 2. VaR / ES ──────────────────────────────────────────────────────

fn bench_var(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_at_risk");
    let engine = RiskEngine::new(100_000.0, RiskConfig::default()).unwrap();

    for &n in &[252, 2520] {
        let returns: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin() * 0.02).collect();
        group.bench_with_input(BenchmarkId::new("historical", n), &n, |b, _| {
            b.iter(|| engine.var_historical(black_box(&returns), 0.95));
        });
        group.bench_with_input(BenchmarkId::new("expected_shortfall", n), &n, |b, _| {
            b.iter(|| engine.expected_shortfall(black_box(&returns), 0.95));
        });
    }
    group.finish();
}

// ── 3. Correlation ───────────────────────────────────────────────────

fn bench_correlation(c: &mut Criterion) {
    let engine = RiskEngine::new(100_000.0, RiskConfig::default()).unwrap();
    let mut by_key: BTreeMap<String, ReturnSeries> = BTreeMap::new();
    for s in 0..10 {
        let series = PriceSeries::new(format!("SYM{s}"), make_bars(1260, s as f64)).unwrap();
        by_key.insert(series.symbol().to_string(), series.close_returns());
    }
    c.bench_function("correlation_10x1260", |b| {
        b.iter(|| engine.correlation_matrix(black_box(&by_key)));
    });
}

// ── 4. ATR ───────────────────────────────────────────────────────────

fn bench_atr(c: &mut Criterion) {
    let bars = make_bars(2520, 0.0);
    c.bench_function("atr_14_2520", |b| {
        b.iter(|| atr(black_box(&bars), 14));
    });
}

criterion_group!(benches, bench_simulator, bench_var, bench_correlation, bench_atr);
criterion_main!(benches);
