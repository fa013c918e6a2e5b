//! Risk engine — Value-at-Risk, Expected Shortfall, correlation, portfolio
//! limits, and volatility-regime stops.
//!
//! Every function is pure over its inputs: no locking, no I/O, safe to run
//! in parallel across symbols. Empty or misaligned inputs fail fast with an
//! error rather than producing a default.

pub mod correlation;
pub mod portfolio;
pub mod regime;
pub mod stats;
pub mod var;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use correlation::CorrelationMatrix;
pub use portfolio::{Diversification, Exposure, RiskLimitCheck};
pub use regime::{DynamicStop, VolatilityRead, VolatilityRegime};

/// How a VaR figure was estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    Historical,
    Parametric,
}

/// A freshly computed risk figure in currency units.
///
/// Not authoritative state; callers cache as needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReading {
    pub method: VarMethod,
    pub confidence_level: f64,
    pub var_amount: f64,
    pub es_amount: Option<f64>,
    pub observations: usize,
}

impl RiskReading {
    /// VaR as a fraction of `capital`.
    pub fn var_pct(&self, capital: f64) -> f64 {
        if capital > 0.0 {
            self.var_amount / capital
        } else {
            0.0
        }
    }
}

/// Risk engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Default VaR confidence used by portfolio limit checks.
    pub confidence: f64,
    /// Minimum return observations for historical VaR and ES.
    pub min_observations: usize,
    /// Number of ATR values in the regime z-score window.
    pub regime_window: usize,
}

impl RiskConfig {
    pub fn validate(&self) -> CoreResult<()> {
        validate_confidence(self.confidence)?;
        if self.min_observations < 2 {
            return Err(CoreError::config(format!(
                "min_observations must be >= 2, got {}",
                self.min_observations
            )));
        }
        if self.regime_window < 2 {
            return Err(CoreError::config(format!(
                "regime_window must be >= 2, got {}",
                self.regime_window
            )));
        }
        Ok(())
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            min_observations: 30,
            regime_window: 20,
        }
    }
}

pub(crate) fn validate_confidence(confidence: f64) -> CoreResult<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(CoreError::config(format!(
            "confidence must be in (0, 1), got {confidence}"
        )))
    }
}

pub(crate) fn validate_returns(returns: &[f64]) -> CoreResult<()> {
    if returns.is_empty() {
        return Err(CoreError::insufficient("return series", 1, 0));
    }
    if let Some(i) = returns.iter().position(|r| !r.is_finite()) {
        return Err(CoreError::Alignment(format!(
            "return series has a non-finite value at index {i}"
        )));
    }
    Ok(())
}

/// Computes risk readings against a fixed capital base.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    capital: f64,
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(capital: f64, config: RiskConfig) -> CoreResult<Self> {
        if !(capital > 0.0) || !capital.is_finite() {
            return Err(CoreError::config(format!(
                "capital must be a positive finite number, got {capital}"
            )));
        }
        config.validate()?;
        Ok(Self { capital, config })
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Same configuration against a different capital base.
    pub fn with_capital(&self, capital: f64) -> CoreResult<Self> {
        Self::new(capital, self.config.clone())
    }
}
