//! Trade simulator — replays a signal stream over price history.
//!
//! Rules per bar, in timestamp order:
//! 1. A non-flat signal with no open trade opens one at the bar's close.
//! 2. An opposite signal closes the open trade at the close, then opens the
//!    reverse trade on the same bar. A same-direction or flat signal is a no-op.
//! 3. The equity point for the bar is `capital + realized PnL`; unrealized PnL
//!    is never marked.
//!
//! A trade still open after the last bar is closed at the last close and
//! flagged `synthetic_exit` so callers can drop it from completed-trade stats.
//! The simulator holds no randomness: identical inputs give identical output.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::costs::CostModel;
use super::stops::StopModel;
use crate::domain::{Bar, EquityPoint, PriceSeries, Side, Signal, Trade};
use crate::error::{CoreError, CoreResult};

/// Validated simulator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub capital: f64,
    /// Fraction of capital risked per trade (0.01 = 1%).
    pub risk_per_trade_pct: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub stop: StopModel,
}

impl SimulationConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.capital > 0.0) {
            return Err(CoreError::config(format!(
                "capital must be > 0, got {}",
                self.capital
            )));
        }
        if !(self.risk_per_trade_pct > 0.0 && self.risk_per_trade_pct <= 1.0) {
            return Err(CoreError::config(format!(
                "risk_per_trade_pct must be in (0, 1], got {}",
                self.risk_per_trade_pct
            )));
        }
        if !(0.0..1.0).contains(&self.commission_pct) {
            return Err(CoreError::config(format!(
                "commission_pct must be in [0, 1), got {}",
                self.commission_pct
            )));
        }
        if !(0.0..1.0).contains(&self.slippage_pct) {
            return Err(CoreError::config(format!(
                "slippage_pct must be in [0, 1), got {}",
                self.slippage_pct
            )));
        }
        self.stop.validate()
    }

    pub fn costs(&self) -> CostModel {
        CostModel {
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
        }
    }

    /// Fixed-fractional position size for a given stop distance.
    pub fn position_size(&self, stop_distance: f64) -> CoreResult<f64> {
        if !(stop_distance > 0.0) || !stop_distance.is_finite() {
            return Err(CoreError::Sizing(format!(
                "stop distance must be a positive finite number, got {stop_distance}"
            )));
        }
        let qty = self.capital * self.risk_per_trade_pct / stop_distance;
        if !(qty > 0.0) || !qty.is_finite() {
            return Err(CoreError::Sizing(format!(
                "computed quantity {qty} is not a positive finite number"
            )));
        }
        Ok(qty)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let costs = CostModel::default();
        Self {
            capital: 100_000.0,
            risk_per_trade_pct: 0.01,
            commission_pct: costs.commission_pct,
            slippage_pct: costs.slippage_pct,
            stop: StopModel::default(),
        }
    }
}

/// Trades and realized-equity curve from one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl SimulationResult {
    /// Trades closed by a signal rather than by the end of the data.
    pub fn completed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| !t.synthetic_exit)
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.equity)
    }
}

/// Open trade plus the bar index it entered on.
struct OpenPosition {
    trade: Trade,
    entry_index: usize,
}

/// Replays signals over bars; owns trade and equity lifecycles for one run.
#[derive(Debug, Clone)]
pub struct TradeSimulator {
    config: SimulationConfig,
    costs: CostModel,
}

impl TradeSimulator {
    pub fn new(config: SimulationConfig) -> CoreResult<Self> {
        config.validate()?;
        let costs = config.costs();
        Ok(Self { config, costs })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate with stop distances from the configured [`StopModel`].
    pub fn simulate(
        &self,
        strategy_id: &str,
        series: &PriceSeries,
        signals: &[Signal],
    ) -> CoreResult<SimulationResult> {
        let stops = self.config.stop.distances(series.bars());
        self.simulate_with_stops(strategy_id, series, signals, &stops)
    }

    /// Simulate with caller-supplied stop distances, one per bar.
    pub fn simulate_with_stops(
        &self,
        strategy_id: &str,
        series: &PriceSeries,
        signals: &[Signal],
        stop_distances: &[f64],
    ) -> CoreResult<SimulationResult> {
        let bars = series.bars();
        if stop_distances.len() != bars.len() {
            return Err(CoreError::Alignment(format!(
                "{} stop distances for {} bars",
                stop_distances.len(),
                bars.len()
            )));
        }
        let aligned = series.align_signals(signals)?;

        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(bars.len());
        let mut realized = 0.0;
        let mut open: Option<OpenPosition> = None;

        for (i, (bar, signal)) in bars.iter().zip(&aligned).enumerate() {
            if let Some(side) = signal.direction.side() {
                let reverse = match &open {
                    Some(pos) => pos.trade.side != side,
                    None => true,
                };
                if reverse {
                    if let Some(pos) = open.take() {
                        let closed = self.close(pos, bar, i, false);
                        realized += closed.pnl;
                        trades.push(closed);
                    }
                    let trade =
                        self.open(strategy_id, series.symbol(), side, bar, stop_distances[i])?;
                    open = Some(OpenPosition {
                        trade,
                        entry_index: i,
                    });
                }
            }

            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: self.config.capital + realized,
            });
        }

        if let (Some(pos), Some(last)) = (open.take(), bars.last()) {
            let closed = self.close(pos, last, bars.len() - 1, true);
            realized += closed.pnl;
            trades.push(closed);
            if let Some(point) = equity_curve.last_mut() {
                point.equity = self.config.capital + realized;
            }
        }

        Ok(SimulationResult {
            trades,
            equity_curve,
        })
    }

    fn open(
        &self,
        strategy_id: &str,
        symbol: &str,
        side: Side,
        bar: &Bar,
        stop_distance: f64,
    ) -> CoreResult<Trade> {
        let quantity = self.config.position_size(stop_distance).map_err(|e| match e {
            CoreError::Sizing(msg) => {
                CoreError::Sizing(format!("{symbol} at {}: {msg}", bar.timestamp))
            }
            other => other,
        })?;
        let price = self.costs.entry_price(side, bar.close);
        let slippage = self.costs.slippage_cost(bar.close, quantity);
        debug!(%symbol, strategy = strategy_id, ?side, price, quantity, "open trade");
        Ok(Trade::open(
            symbol,
            strategy_id,
            side,
            bar.timestamp,
            price,
            quantity,
            stop_distance,
            slippage,
        ))
    }

    fn close(&self, pos: OpenPosition, bar: &Bar, index: usize, synthetic: bool) -> Trade {
        let mut trade = pos.trade;
        let price = self.costs.exit_price(trade.side, bar.close);
        let slippage = self.costs.slippage_cost(bar.close, trade.quantity);
        trade.close(
            bar.timestamp,
            price,
            slippage,
            self.costs.commission_pct,
            synthetic,
        );
        trade.bars_held = index - pos.entry_index;
        debug!(
            symbol = %trade.symbol,
            strategy = %trade.strategy_id,
            pnl = trade.pnl,
            synthetic,
            "close trade"
        );
        trade
    }
}
