//! Volatility regime from a z-scored ATR window, and the regime-adjusted stop.
//!
//! z = (ATR_now - mean(ATR_window)) / std(ATR_window) over the last
//! `regime_window` ATR values. z > 1 is HIGH (1.3x), z < -1 is LOW (0.8x).

use serde::{Deserialize, Serialize};

use super::stats::{mean, sample_std};
use super::RiskEngine;
use crate::domain::{Bar, Side};
use crate::error::{CoreError, CoreResult};
use crate::indicators::atr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

impl VolatilityRegime {
    pub fn from_z_score(z: f64) -> Self {
        if z > 1.0 {
            Self::High
        } else if z < -1.0 {
            Self::Low
        } else {
            Self::Normal
        }
    }

    /// Multiplier applied to the base stop distance.
    pub fn adjustment_factor(self) -> f64 {
        match self {
            Self::Low => 0.8,
            Self::Normal => 1.0,
            Self::High => 1.3,
        }
    }
}

/// Latest ATR with its regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRead {
    pub atr: f64,
    pub z_score: f64,
    pub regime: VolatilityRegime,
}

impl VolatilityRead {
    pub fn adjustment_factor(&self) -> f64 {
        self.regime.adjustment_factor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicStop {
    pub stop_loss: f64,
    pub distance: f64,
    pub atr: f64,
    pub z_score: f64,
    pub regime: VolatilityRegime,
    pub adjustment_factor: f64,
}

impl RiskEngine {
    /// Current ATR and regime. Needs `atr_period + regime_window` bars.
    pub fn volatility(&self, bars: &[Bar], atr_period: usize) -> CoreResult<VolatilityRead> {
        if atr_period == 0 {
            return Err(CoreError::config("ATR period must be >= 1"));
        }
        let window = self.config.regime_window;
        let needed = atr_period + window;
        if bars.len() < needed {
            return Err(CoreError::insufficient("volatility regime", needed, bars.len()));
        }
        let series = atr(bars, atr_period);
        let recent = &series[series.len() - window..];
        if recent.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::insufficient("volatility regime", needed, bars.len()));
        }
        let current = recent[window - 1];
        let sd = sample_std(recent);
        let z_score = if sd > 1e-12 {
            (current - mean(recent)) / sd
        } else {
            0.0
        };
        Ok(VolatilityRead {
            atr: current,
            z_score,
            regime: VolatilityRegime::from_z_score(z_score),
        })
    }

    /// `entry -/+ ATR * base_multiplier * adjustment_factor` for long/short.
    pub fn dynamic_stop(
        &self,
        bars: &[Bar],
        entry_price: f64,
        side: Side,
        atr_period: usize,
        base_multiplier: f64,
    ) -> CoreResult<DynamicStop> {
        if !(base_multiplier > 0.0) {
            return Err(CoreError::config(format!(
                "stop multiplier must be > 0, got {base_multiplier}"
            )));
        }
        let read = self.volatility(bars, atr_period)?;
        let factor = read.adjustment_factor();
        let distance = read.atr * base_multiplier * factor;
        let stop_loss = entry_price - side.sign() * distance;
        Ok(DynamicStop {
            stop_loss,
            distance,
            atr: read.atr,
            z_score: read.z_score,
            regime: read.regime,
            adjustment_factor: factor,
        })
    }
}
