//! Time-series momentum — rate of change over `lookback` bars compared to
//! a symmetric `threshold`.

use crate::domain::{Bar, Direction, Signal};
use crate::error::{CoreError, CoreResult};

use super::{Strategy, StrategyParams};

#[derive(Debug, Clone, Copy, Default)]
pub struct Momentum;

impl Momentum {
    fn threshold(params: &StrategyParams) -> CoreResult<f64> {
        let t = params.get_or("threshold", 0.02);
        if t >= 0.0 && t.is_finite() {
            Ok(t)
        } else {
            Err(CoreError::config(format!(
                "momentum: threshold must be >= 0, got {t}"
            )))
        }
    }
}

impl Strategy for Momentum {
    fn id(&self) -> &str {
        "momentum"
    }

    fn default_params(&self) -> StrategyParams {
        StrategyParams::new()
            .with("lookback", 20.0)
            .with("threshold", 0.02)
    }

    fn warmup_bars(&self, params: &StrategyParams) -> CoreResult<usize> {
        params.period("lookback", 20)
    }

    fn compute(&self, bars: &[Bar], params: &StrategyParams) -> CoreResult<Vec<Signal>> {
        let lookback = params.period("lookback", 20)?;
        let threshold = Self::threshold(params)?;
        Ok(bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                if i < lookback || bars[i - lookback].close <= 0.0 {
                    return Signal::flat(bar.timestamp);
                }
                let roc = bar.close / bars[i - lookback].close - 1.0;
                if roc.abs() <= threshold {
                    return Signal::flat(bar.timestamp);
                }
                let strength = if threshold > 0.0 {
                    roc.abs() / (2.0 * threshold)
                } else {
                    1.0
                };
                Signal::new(bar.timestamp, Direction::from_sign(roc), strength)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn strong_rise_is_long() {
        let bars = make_bars(&[100.0, 102.0, 105.0, 110.0]);
        let p = StrategyParams::new().with("lookback", 3.0).with("threshold", 0.05);
        let s = Momentum.compute(&bars, &p).unwrap();
        assert_eq!(s[3].direction, Direction::Long);
        assert_eq!(s[3].strength, 1.0);
    }

    #[test]
    fn move_within_threshold_is_flat() {
        let bars = make_bars(&[100.0, 101.0, 100.5, 101.0]);
        let p = StrategyParams::new().with("lookback", 3.0).with("threshold", 0.05);
        let s = Momentum.compute(&bars, &p).unwrap();
        assert!(s.iter().all(|x| x.direction.is_flat()));
    }

    #[test]
    fn negative_threshold_is_config_error() {
        let p = StrategyParams::new().with("threshold", -0.1);
        assert!(Momentum.compute(&[], &p).is_err());
    }
}
