//! Stop distances used to size new trades.
//!
//! Sizing: `quantity = capital * risk_per_trade_pct / stop_distance`.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::{CoreError, CoreResult};
use crate::indicators::atr;

/// Source of the per-bar stop distance (price units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopModel {
    /// Constant distance from entry.
    Fixed { distance: f64 },
    /// `multiplier * ATR(period)` at the entry bar.
    Atr { period: usize, multiplier: f64 },
}

impl StopModel {
    pub fn validate(&self) -> CoreResult<()> {
        match *self {
            Self::Fixed { distance } if !(distance > 0.0) => Err(CoreError::config(format!(
                "fixed stop distance must be > 0, got {distance}"
            ))),
            Self::Atr { period, .. } if period == 0 => {
                Err(CoreError::config("ATR stop period must be >= 1"))
            }
            Self::Atr { multiplier, .. } if !(multiplier > 0.0) => Err(CoreError::config(
                format!("ATR stop multiplier must be > 0, got {multiplier}"),
            )),
            _ => Ok(()),
        }
    }

    /// Stop distance for every bar; NaN where the model has no data yet.
    pub fn distances(&self, bars: &[Bar]) -> Vec<f64> {
        match *self {
            Self::Fixed { distance } => vec![distance; bars.len()],
            Self::Atr { period, multiplier } => atr(bars, period)
                .into_iter()
                .map(|a| a * multiplier)
                .collect(),
        }
    }

    /// Bars of history needed before the first valid distance.
    pub fn warmup_bars(&self) -> usize {
        match *self {
            Self::Fixed { .. } => 0,
            Self::Atr { period, .. } => period,
        }
    }
}

impl Default for StopModel {
    fn default() -> Self {
        Self::Atr {
            period: 14,
            multiplier: 2.0,
        }
    }
}
