//! Value-at-Risk and Expected Shortfall over a return series.
//!
//! Returns are fractions of capital per period; amounts are in currency.
//! A VaR whose quantile return is positive (no loss in the tail) is 0.

use super::stats::{mean, normal_quantile, sample_std, tail_index};
use super::{validate_confidence, validate_returns, RiskEngine, RiskReading, VarMethod};
use crate::error::{CoreError, CoreResult};

impl RiskEngine {
    /// Historical VaR: the `floor((1 - c) * n)`-th smallest return, negated.
    pub fn var_historical(&self, returns: &[f64], confidence: f64) -> CoreResult<RiskReading> {
        let (_, quantile) = self.historical_quantile(returns, confidence)?;
        Ok(RiskReading {
            method: VarMethod::Historical,
            confidence_level: confidence,
            var_amount: (-quantile).max(0.0) * self.capital,
            es_amount: None,
            observations: returns.len(),
        })
    }

    /// Parametric (normal) VaR: `(z(c) * std - mean) * capital`.
    pub fn var_parametric(&self, returns: &[f64], confidence: f64) -> CoreResult<RiskReading> {
        validate_confidence(confidence)?;
        validate_returns(returns)?;
        if returns.len() < 2 {
            return Err(CoreError::insufficient("parametric VaR", 2, returns.len()));
        }
        let z = normal_quantile(confidence)?;
        let var = (z * sample_std(returns) - mean(returns)) * self.capital;
        Ok(RiskReading {
            method: VarMethod::Parametric,
            confidence_level: confidence,
            var_amount: var.max(0.0),
            es_amount: None,
            observations: returns.len(),
        })
    }

    /// Expected Shortfall: mean loss over returns at or below the VaR return.
    ///
    /// The reading carries both the historical VaR and the ES amount.
    pub fn expected_shortfall(&self, returns: &[f64], confidence: f64) -> CoreResult<RiskReading> {
        let (_, quantile) = self.historical_quantile(returns, confidence)?;
        let threshold = quantile.min(0.0);
        let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= threshold).collect();
        if tail.is_empty() {
            return Err(CoreError::insufficient("expected shortfall tail", 1, 0));
        }
        Ok(RiskReading {
            method: VarMethod::Historical,
            confidence_level: confidence,
            var_amount: (-quantile).max(0.0) * self.capital,
            es_amount: Some(-mean(&tail) * self.capital),
            observations: returns.len(),
        })
    }

    fn historical_quantile(&self, returns: &[f64], confidence: f64) -> CoreResult<(usize, f64)> {
        validate_confidence(confidence)?;
        validate_returns(returns)?;
        let needed = self.config.min_observations;
        if returns.len() < needed {
            return Err(CoreError::insufficient("historical VaR", needed, returns.len()));
        }
        let mut sorted = returns.to_vec();
        sorted.sort_by(f64::total_cmp);
        let idx = tail_index(confidence, sorted.len());
        Ok((idx, sorted[idx]))
    }
}
