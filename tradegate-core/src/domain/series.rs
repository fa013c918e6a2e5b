//! PriceSeries — validated, ordered bars for one symbol, plus signal alignment.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::signal::Signal;
use crate::error::{CoreError, CoreResult};

/// Return observations keyed by timestamp.
///
/// A `BTreeMap` keeps the series ordered and free of duplicate timestamps, so
/// aligning two series is a key intersection.
pub type ReturnSeries = BTreeMap<DateTime<Utc>, f64>;

/// Ordered OHLCV bars for a single symbol.
///
/// Timestamps are unique and strictly increasing; gaps are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Validate and wrap a bar sequence.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> CoreResult<Self> {
        let symbol = symbol.into();
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(CoreError::Alignment(format!(
                    "{symbol}: bar {i} at {} fails OHLC sanity check",
                    bar.timestamp
                )));
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(CoreError::Alignment(format!(
                    "{symbol}: bar {i} timestamp {} is not after {}",
                    bar.timestamp,
                    bars[i - 1].timestamp
                )));
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The first `n` bars (all of them if shorter).
    pub fn head(&self, n: usize) -> PriceSeries {
        PriceSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[..n.min(self.bars.len())].to_vec(),
        }
    }

    /// Close-to-close simple returns keyed by the later bar's timestamp.
    pub fn close_returns(&self) -> ReturnSeries {
        self.bars
            .windows(2)
            .map(|w| (w[1].timestamp, (w[1].close - w[0].close) / w[0].close))
            .collect()
    }

    /// Align a signal stream to the bars: one signal per bar.
    ///
    /// Signals must be strictly increasing and each must land on a bar
    /// timestamp. Bars without a signal receive a flat signal.
    pub fn align_signals(&self, signals: &[Signal]) -> CoreResult<Vec<Signal>> {
        for w in signals.windows(2) {
            if w[1].timestamp <= w[0].timestamp {
                return Err(CoreError::Alignment(format!(
                    "{}: signal timestamp {} is not after {}",
                    self.symbol, w[1].timestamp, w[0].timestamp
                )));
            }
        }

        let mut aligned = Vec::with_capacity(self.bars.len());
        let mut next = signals.iter().peekable();
        for bar in &self.bars {
            match next.peek() {
                Some(sig) if sig.timestamp == bar.timestamp => {
                    aligned.push((*sig).clone());
                    next.next();
                }
                Some(sig) if sig.timestamp < bar.timestamp => {
                    return Err(CoreError::Alignment(format!(
                        "{}: signal at {} has no matching bar",
                        self.symbol, sig.timestamp
                    )));
                }
                _ => aligned.push(Signal::flat(bar.timestamp)),
            }
        }

        if let Some(sig) = next.next() {
            return Err(CoreError::Alignment(format!(
                "{}: signal at {} is after the last bar",
                self.symbol, sig.timestamp
            )));
        }
        Ok(aligned)
    }
}
