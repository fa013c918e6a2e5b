//! Bar and signal loading: CSV files and a seeded synthetic generator.
//!
//! Bar CSV columns: `timestamp,open,high,low,close,volume`.
//! Signal CSV columns: `timestamp,direction,strength` with direction in
//! `{-1, 0, 1}`. Timestamps are RFC 3339 or plain `YYYY-MM-DD` dates
//! (midnight UTC).
//!
//! Synthetic bars are a random walk from 100.0, seeded from the symbol, so
//! the same symbol always yields the same series.

use std::io;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use tradegate_core::domain::{Bar, Direction, PriceSeries, Signal};

use crate::error::{RunnerError, RunnerResult};

#[derive(Debug, Deserialize)]
struct BarRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct SignalRow {
    timestamp: String,
    direction: Direction,
    #[serde(default = "full_strength")]
    strength: f64,
}

fn full_strength() -> f64 {
    1.0
}

pub fn parse_timestamp(text: &str) -> RunnerResult<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| RunnerError::InvalidData(format!("unrecognized timestamp '{text}'")))
}

/// Validated series from CSV text.
pub fn read_bars<R: io::Read>(symbol: &str, reader: R) -> RunnerResult<PriceSeries> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for row in rdr.deserialize::<BarRow>() {
        let row = row?;
        bars.push(Bar {
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(PriceSeries::new(symbol, bars)?)
}

pub fn load_bars_csv(symbol: &str, path: &Path) -> RunnerResult<PriceSeries> {
    read_bars(symbol, std::fs::File::open(path)?)
}

/// Signals from CSV text, in file order. Ordering is checked when they are
/// aligned to a series.
pub fn read_signals<R: io::Read>(reader: R) -> RunnerResult<Vec<Signal>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut signals = Vec::new();
    for row in rdr.deserialize::<SignalRow>() {
        let row = row?;
        signals.push(Signal::new(
            parse_timestamp(&row.timestamp)?,
            row.direction,
            row.strength,
        ));
    }
    Ok(signals)
}

pub fn load_signals_csv(path: &Path) -> RunnerResult<Vec<Signal>> {
    read_signals(std::fs::File::open(path)?)
}

/// `count` weekday bars starting at `start`, deterministic per symbol.
pub fn synthetic_bars(symbol: &str, start: NaiveDate, count: usize) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut day = start;
    while bars.len() < count {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day += chrono::Duration::days(1);
            continue;
        }
        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();
        bars.push(Bar {
            timestamp: day.and_time(NaiveTime::MIN).and_utc(),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
        day += chrono::Duration::days(1);
    }
    bars
}

pub fn synthetic_series(symbol: &str, start: NaiveDate, count: usize) -> RunnerResult<PriceSeries> {
    Ok(PriceSeries::new(symbol, synthetic_bars(symbol, start, count))?)
}
