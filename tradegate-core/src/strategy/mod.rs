//! Strategies — uniform `compute(bars, params) -> signals` capability.
//!
//! Strategies are portfolio-agnostic: they see only bar history and their
//! own parameters. Callers depend on [`Strategy`] and look concrete
//! strategies up by id in a [`StrategyRegistry`].

pub mod donchian;
pub mod ma_crossover;
pub mod momentum;
pub mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Signal};
use crate::error::{CoreError, CoreResult};

pub use donchian::DonchianBreakout;
pub use ma_crossover::MaCrossover;
pub use momentum::Momentum;
pub use registry::StrategyRegistry;

/// Named numeric parameters for one strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyParams(pub BTreeMap<String, f64>);

impl StrategyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Value of `name`, or `default` when absent.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Positive integer parameter (window lengths).
    pub fn period(&self, name: &str, default: usize) -> CoreResult<usize> {
        match self.get(name) {
            None => Ok(default),
            Some(v) if v >= 1.0 && v.fract() == 0.0 && v.is_finite() => Ok(v as usize),
            Some(v) => Err(CoreError::config(format!(
                "parameter '{name}' must be a positive integer, got {v}"
            ))),
        }
    }

    /// `self` with any missing keys taken from `defaults`.
    pub fn merged_over(&self, defaults: &StrategyParams) -> StrategyParams {
        let mut out = defaults.clone();
        for (k, v) in &self.0 {
            out.0.insert(k.clone(), *v);
        }
        out
    }
}

/// A signal-generating strategy registered under a stable id.
pub trait Strategy: Send + Sync {
    /// Stable identifier (e.g. "ma_crossover").
    fn id(&self) -> &str;

    fn default_params(&self) -> StrategyParams;

    /// Bars needed before the first non-flat signal.
    fn warmup_bars(&self, params: &StrategyParams) -> CoreResult<usize>;

    /// One signal per bar, flat during warmup. Uses only `bars[..=i]` for
    /// the signal at `i`.
    fn compute(&self, bars: &[Bar], params: &StrategyParams) -> CoreResult<Vec<Signal>>;
}
