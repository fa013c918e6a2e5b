//! Trade — one position from entry to exit, with realized PnL once closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::Side;

/// Lifecycle status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// A single trade for a `(symbol, strategy)` pair.
///
/// At most one `Open` trade exists per pair at any time; the simulator and the
/// live book both enforce this. Prices already include slippage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Identification ──
    pub symbol: String,
    pub strategy_id: String,
    pub side: Side,

    // ── Entry ──
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub quantity: f64,
    /// Stop distance used for sizing (price units).
    pub stop_distance: f64,

    // ── Exit ──
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,

    // ── PnL ──
    pub gross_pnl: f64,
    pub commission: f64,
    /// Slippage cost in currency across entry and exit.
    pub slippage: f64,
    pub pnl: f64,
    pub pnl_pct: f64,

    pub status: TradeStatus,
    /// Closed by the end of the data rather than by a signal or a stop.
    pub synthetic_exit: bool,
    pub bars_held: usize,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        symbol: impl Into<String>,
        strategy_id: impl Into<String>,
        side: Side,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        quantity: f64,
        stop_distance: f64,
        entry_slippage: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            strategy_id: strategy_id.into(),
            side,
            entry_time,
            entry_price,
            quantity,
            stop_distance,
            exit_time: None,
            exit_price: None,
            gross_pnl: 0.0,
            commission: 0.0,
            slippage: entry_slippage,
            pnl: 0.0,
            pnl_pct: 0.0,
            status: TradeStatus::Open,
            synthetic_exit: false,
            bars_held: 0,
        }
    }

    /// Close the trade and realize its PnL.
    ///
    /// `commission = (entry + exit) * qty * commission_pct`,
    /// `pnl = gross - commission`. Closing an already-closed trade is a no-op.
    pub fn close(
        &mut self,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_slippage: f64,
        commission_pct: f64,
        synthetic: bool,
    ) {
        if !self.is_open() {
            return;
        }
        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.gross_pnl = (exit_price - self.entry_price) * self.quantity * self.side.sign();
        self.commission = (self.entry_price + exit_price) * self.quantity * commission_pct;
        self.slippage += exit_slippage;
        self.pnl = self.gross_pnl - self.commission;
        let notional = self.entry_price * self.quantity;
        self.pnl_pct = if notional > 0.0 { self.pnl / notional } else { 0.0 };
        self.status = TradeStatus::Closed;
        self.synthetic_exit = synthetic;
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_winner(&self) -> bool {
        self.status == TradeStatus::Closed && self.pnl > 0.0
    }

    /// Capital at risk at entry: stop distance times quantity.
    pub fn risk_amount(&self) -> f64 {
        self.stop_distance * self.quantity
    }

    /// Signed notional at entry (negative for shorts).
    pub fn signed_notional(&self) -> f64 {
        self.entry_price * self.quantity * self.side.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn long_trade() -> Trade {
        Trade::open("BTC", "ma_crossover", Side::Long, t(2), 100.0, 50.0, 4.0, 0.0)
    }

    #[test]
    fn open_trade_has_no_realized_pnl() {
        let trade = long_trade();
        assert!(trade.is_open());
        assert_eq!(trade.pnl, 0.0);
        assert_eq!(trade.exit_price, None);
        assert!((trade.risk_amount() - 200.0).abs() < 1e-10);
    }

    #[test]
    fn close_long_realizes_pnl_net_of_commission() {
        let mut trade = long_trade();
        trade.close(t(5), 110.0, 0.0, 0.001, false);
        assert_eq!(trade.status, TradeStatus::Closed);
        assert!((trade.gross_pnl - 500.0).abs() < 1e-10);
        let commission = (100.0 + 110.0) * 50.0 * 0.001;
        assert!((trade.commission - commission).abs() < 1e-10);
        assert!((trade.pnl - (500.0 - commission)).abs() < 1e-10);
        assert!((trade.pnl_pct - trade.pnl / 5_000.0).abs() < 1e-10);
        assert!(trade.is_winner());
    }

    #[test]
    fn close_short_gains_when_price_falls() {
        let mut trade = Trade::open("BTC", "s", Side::Short, t(2), 100.0, 10.0, 2.0, 0.0);
        trade.close(t(3), 90.0, 0.0, 0.0, false);
        assert!((trade.gross_pnl - 100.0).abs() < 1e-10);
        assert!(trade.signed_notional() < 0.0);
    }

    #[test]
    fn closing_twice_is_noop() {
        let mut trade = long_trade();
        trade.close(t(5), 110.0, 0.0, 0.0, false);
        trade.close(t(6), 50.0, 0.0, 0.0, true);
        assert_eq!(trade.exit_price, Some(110.0));
        assert!(!trade.synthetic_exit);
    }
}
