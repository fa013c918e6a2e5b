//! Donchian channel breakout — long on a close above the prior N-bar high,
//! short on a close below the prior N-bar low. Flat otherwise.

use crate::domain::{Bar, Direction, Signal};
use crate::error::CoreResult;

use super::{Strategy, StrategyParams};

#[derive(Debug, Clone, Copy, Default)]
pub struct DonchianBreakout;

impl Strategy for DonchianBreakout {
    fn id(&self) -> &str {
        "donchian_breakout"
    }

    fn default_params(&self) -> StrategyParams {
        StrategyParams::new().with("lookback", 20.0)
    }

    fn warmup_bars(&self, params: &StrategyParams) -> CoreResult<usize> {
        params.period("lookback", 20)
    }

    fn compute(&self, bars: &[Bar], params: &StrategyParams) -> CoreResult<Vec<Signal>> {
        let lookback = params.period("lookback", 20)?;
        Ok(bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                if i < lookback {
                    return Signal::flat(bar.timestamp);
                }
                // Channel excludes the current bar.
                let window = &bars[i - lookback..i];
                let upper = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
                let lower = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
                if bar.close > upper {
                    Signal::new(bar.timestamp, Direction::Long, 1.0)
                } else if bar.close < lower {
                    Signal::new(bar.timestamp, Direction::Short, 1.0)
                } else {
                    Signal::flat(bar.timestamp)
                }
            })
            .collect())
    }
}
