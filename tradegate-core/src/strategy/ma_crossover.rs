//! Moving average crossover — long while the fast SMA is above the slow SMA,
//! short while below.

use crate::domain::{Bar, Direction, Signal};
use crate::error::{CoreError, CoreResult};
use crate::indicators::sma;

use super::{Strategy, StrategyParams};

#[derive(Debug, Clone, Copy, Default)]
pub struct MaCrossover;

impl MaCrossover {
    fn periods(params: &StrategyParams) -> CoreResult<(usize, usize)> {
        let fast = params.period("fast", 10)?;
        let slow = params.period("slow", 50)?;
        if slow <= fast {
            return Err(CoreError::config(format!(
                "ma_crossover: slow ({slow}) must be > fast ({fast})"
            )));
        }
        Ok((fast, slow))
    }
}

impl Strategy for MaCrossover {
    fn id(&self) -> &str {
        "ma_crossover"
    }

    fn default_params(&self) -> StrategyParams {
        StrategyParams::new().with("fast", 10.0).with("slow", 50.0)
    }

    fn warmup_bars(&self, params: &StrategyParams) -> CoreResult<usize> {
        Ok(Self::periods(params)?.1)
    }

    fn compute(&self, bars: &[Bar], params: &StrategyParams) -> CoreResult<Vec<Signal>> {
        let (fast, slow) = Self::periods(params)?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast_ma = sma(&closes, fast);
        let slow_ma = sma(&closes, slow);

        Ok(bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let (f, s) = (fast_ma[i], slow_ma[i]);
                if i < slow || f.is_nan() || s.is_nan() || s <= 0.0 {
                    return Signal::flat(bar.timestamp);
                }
                let spread = (f - s) / s;
                // 2% separation is full conviction.
                Signal::new(bar.timestamp, Direction::from_sign(spread), spread.abs() / 0.02)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn params() -> StrategyParams {
        StrategyParams::new().with("fast", 2.0).with("slow", 4.0)
    }

    #[test]
    fn flat_during_warmup() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let signals = MaCrossover.compute(&bars, &params()).unwrap();
        assert_eq!(signals.len(), 5);
        assert!(signals[..3].iter().all(|s| s.direction.is_flat()));
    }

    #[test]
    fn rising_prices_go_long_falling_go_short() {
        let up = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let s = MaCrossover.compute(&up, &params()).unwrap();
        assert_eq!(s[5].direction, Direction::Long);

        let down = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let s = MaCrossover.compute(&down, &params()).unwrap();
        assert_eq!(s[5].direction, Direction::Short);
    }

    #[test]
    fn slow_not_above_fast_is_config_error() {
        let p = StrategyParams::new().with("fast", 5.0).with("slow", 5.0);
        assert!(MaCrossover.compute(&[], &p).is_err());
    }
}
