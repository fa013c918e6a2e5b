//! Volatility-scaled price bands around entry, stop and target points.
//!
//! `low = point - atr * m`, `high = point + atr * m`. When no ATR is
//! available the band falls back to a fixed percentage width and says so.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction};
use crate::error::{CoreError, CoreResult};
use crate::indicators::latest_atr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSource {
    Volatility,
    Fallback,
}

/// Band around a point price. `low <= point <= high`, `width_pct > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub point: f64,
    pub low: f64,
    pub high: f64,
    pub width_pct: f64,
    /// Direction of the signal the band was built for. Does not shape it.
    pub direction: Direction,
    pub source: RangeSource,
}

impl PriceRange {
    pub fn is_fallback(&self) -> bool {
        self.source == RangeSource::Fallback
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub range_multiplier: f64,
    /// Total band width as a fraction of the point when ATR is unavailable.
    pub fallback_width_pct: f64,
    pub atr_period: usize,
}

impl RangeConfig {
    pub fn validate(&self) -> CoreResult<()> {
        check_multiplier(self.range_multiplier)?;
        if !(self.fallback_width_pct > 0.0 && self.fallback_width_pct < 2.0) {
            return Err(CoreError::config(format!(
                "fallback_width_pct must be in (0, 2), got {}",
                self.fallback_width_pct
            )));
        }
        if self.atr_period == 0 {
            return Err(CoreError::config("range ATR period must be >= 1"));
        }
        Ok(())
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            range_multiplier: 0.5,
            fallback_width_pct: 0.01,
            atr_period: 14,
        }
    }
}

fn check_multiplier(m: f64) -> CoreResult<()> {
    if m > 0.0 && m.is_finite() {
        Ok(())
    } else {
        Err(CoreError::config(format!(
            "range multiplier must be > 0, got {m}"
        )))
    }
}

#[derive(Debug, Clone)]
pub struct RangeCalculator {
    config: RangeConfig,
}

impl RangeCalculator {
    pub fn new(config: RangeConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RangeConfig {
        &self.config
    }

    /// Symmetric band around `point`. A missing, zero or non-finite `atr`
    /// takes the fallback width.
    pub fn band(
        &self,
        point: f64,
        direction: Direction,
        atr: Option<f64>,
        range_multiplier: f64,
    ) -> CoreResult<PriceRange> {
        check_multiplier(range_multiplier)?;
        if !(point > 0.0) || !point.is_finite() {
            return Err(CoreError::config(format!(
                "range point must be a positive price, got {point}"
            )));
        }
        let (low, high, source) = match atr.filter(|a| a.is_finite() && *a > 0.0) {
            Some(a) => {
                let half = a * range_multiplier;
                (point - half, point + half, RangeSource::Volatility)
            }
            None => {
                let half = point * self.config.fallback_width_pct / 2.0;
                (point - half, point + half, RangeSource::Fallback)
            }
        };
        Ok(PriceRange {
            point,
            low,
            high,
            width_pct: (high - low) / point,
            direction,
            source,
        })
    }

    /// Band using the configured multiplier and the latest ATR of `bars`;
    /// falls back when the history is shorter than the ATR period.
    pub fn band_from_bars(
        &self,
        point: f64,
        direction: Direction,
        bars: &[Bar],
    ) -> CoreResult<PriceRange> {
        let atr = latest_atr(bars, self.config.atr_period);
        self.band(point, direction, atr, self.config.range_multiplier)
    }
}
