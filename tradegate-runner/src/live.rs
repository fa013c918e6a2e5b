//! Live book — per-symbol open trades behind per-symbol locks.
//!
//! Every operation on a symbol (evaluation, position watch, forced close)
//! holds that symbol's slot lock for its whole read-modify-write sequence.
//! Different symbols never contend.
//!
//! Forced close does not wait its turn: the request is parked in a separate
//! pending cell first. Whoever holds the slot lock drains that cell when it
//! acquires the lock and again between evaluation phases, so a forced close
//! lands even while an evaluation is mid-flight. While a request is parked,
//! later requests for the same symbol are dropped; the earliest price wins.
//!
//! Closed trades are kept only as a short recent history per symbol; the
//! desk persists every closed trade to its record log.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use tracing::info;

use tradegate_core::domain::{Bar, Side, Trade};
use tradegate_core::engine::CostModel;

/// Closed trades kept in memory per symbol.
pub const CLOSED_TRADE_HISTORY: usize = 256;

/// An open live trade with its protective levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePosition {
    pub trade: Trade,
    pub stop_loss: f64,
    pub target: f64,
}

impl LivePosition {
    /// Exit level touched by `bar`, stop first.
    fn exit_level(&self, bar: &Bar) -> Option<f64> {
        match self.trade.side {
            Side::Long if bar.low <= self.stop_loss => Some(self.stop_loss),
            Side::Long if bar.high >= self.target => Some(self.target),
            Side::Short if bar.high >= self.stop_loss => Some(self.stop_loss),
            Side::Short if bar.low <= self.target => Some(self.target),
            _ => None,
        }
    }
}

/// Mutable state of one symbol. Only reachable through a [`SymbolGuard`].
#[derive(Debug, Default)]
pub struct SymbolBook {
    /// Open positions keyed by strategy id; at most one per strategy.
    positions: BTreeMap<String, LivePosition>,
    last_trade_date: Option<NaiveDate>,
    closed: VecDeque<Trade>,
    forced: Vec<Trade>,
}

impl SymbolBook {
    pub fn position(&self, strategy_id: &str) -> Option<&LivePosition> {
        self.positions.get(strategy_id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &LivePosition> {
        self.positions.values()
    }

    pub fn last_trade_date(&self) -> Option<NaiveDate> {
        self.last_trade_date
    }

    /// Most recent closed trades, oldest first.
    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.closed.iter()
    }
}

#[derive(Debug, Clone, Copy)]
struct ForcedClose {
    price: f64,
    time: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Slot {
    book: Mutex<SymbolBook>,
    pending: Mutex<Option<ForcedClose>>,
}

/// Exclusive access to one symbol's book.
pub struct SymbolGuard<'a> {
    symbol: &'a str,
    book: MutexGuard<'a, SymbolBook>,
    pending: &'a Mutex<Option<ForcedClose>>,
    costs: CostModel,
}

impl SymbolGuard<'_> {
    pub fn symbol(&self) -> &str {
        self.symbol
    }

    pub fn book(&self) -> &SymbolBook {
        &self.book
    }

    /// Applies a parked forced close, if any. Returns true when one ran.
    pub fn drain_pending(&mut self) -> bool {
        let Some(req) = self.pending.lock().take() else {
            return false;
        };
        let ids: Vec<String> = self.book.positions.keys().cloned().collect();
        for id in ids {
            if let Some(trade) = self.close(&id, req.price, req.time) {
                info!(
                    symbol = self.symbol,
                    strategy = %trade.strategy_id,
                    price = req.price,
                    pnl = trade.pnl,
                    "forced close"
                );
                self.book.forced.push(trade);
            }
        }
        true
    }

    /// Opens `position`, first closing any opposite trade of the same
    /// strategy at `position`'s entry reference `price`.
    pub fn open(&mut self, position: LivePosition, price: f64, date: NaiveDate) -> Option<Trade> {
        let id = position.trade.strategy_id.clone();
        let reversed = self.close(&id, price, position.trade.entry_time);
        self.book.positions.insert(id, position);
        self.book.last_trade_date = Some(date);
        reversed
    }

    /// Closes the strategy's open trade at reference `price`.
    pub fn close(&mut self, strategy_id: &str, price: f64, time: DateTime<Utc>) -> Option<Trade> {
        let mut pos = self.book.positions.remove(strategy_id)?;
        let side = pos.trade.side;
        let qty = pos.trade.quantity;
        pos.trade.close(
            time,
            self.costs.exit_price(side, price),
            self.costs.slippage_cost(price, qty),
            self.costs.commission_pct,
            false,
        );
        if self.book.closed.len() == CLOSED_TRADE_HISTORY {
            self.book.closed.pop_front();
        }
        self.book.closed.push_back(pos.trade.clone());
        Some(pos.trade)
    }
}

/// Per-symbol live trade state for the decision engine.
#[derive(Debug, Default)]
pub struct LiveBook {
    costs: CostModel,
    slots: RwLock<BTreeMap<String, Arc<Slot>>>,
}

impl LiveBook {
    pub fn new(costs: CostModel) -> Self {
        Self {
            costs,
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    fn slot(&self, symbol: &str) -> Arc<Slot> {
        if let Some(slot) = self.slots.read().get(symbol) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(symbol.to_string()).or_default())
    }

    /// Runs `f` with exclusive access to `symbol`, after draining any
    /// parked forced close.
    pub fn with_symbol<R>(&self, symbol: &str, f: impl FnOnce(&mut SymbolGuard<'_>) -> R) -> R {
        let slot = self.slot(symbol);
        let mut guard = SymbolGuard {
            symbol,
            book: slot.book.lock(),
            pending: &slot.pending,
            costs: self.costs,
        };
        guard.drain_pending();
        f(&mut guard)
    }

    /// Parks a forced close for `symbol` unless one is already waiting.
    fn park_forced_close(&self, slot: &Slot, price: f64, time: DateTime<Utc>) {
        slot.pending.lock().get_or_insert(ForcedClose { price, time });
    }

    /// Closes every open trade on `symbol` at `price`, pre-empting any
    /// in-flight evaluation. No open trade is a no-op.
    pub fn force_close(&self, symbol: &str, price: f64, time: DateTime<Utc>) -> Vec<Trade> {
        let slot = self.slot(symbol);
        self.park_forced_close(&slot, price, time);
        let mut guard = SymbolGuard {
            symbol,
            book: slot.book.lock(),
            pending: &slot.pending,
            costs: self.costs,
        };
        guard.drain_pending();
        std::mem::take(&mut guard.book.forced)
    }

    /// Closes open trades whose stop (checked first) or target `bar` touches.
    pub fn watch_position(&self, symbol: &str, bar: &Bar) -> Vec<Trade> {
        self.with_symbol(symbol, |guard| {
            let hits: Vec<(String, f64)> = guard
                .book
                .positions
                .iter()
                .filter_map(|(id, pos)| pos.exit_level(bar).map(|lvl| (id.clone(), lvl)))
                .collect();
            hits.into_iter()
                .filter_map(|(id, level)| {
                    let trade = guard.close(&id, level, bar.timestamp)?;
                    info!(
                        symbol,
                        strategy = %trade.strategy_id,
                        exit = level,
                        pnl = trade.pnl,
                        "position exit"
                    );
                    Some(trade)
                })
                .collect()
        })
    }

    /// Copies of the open positions on `symbol`.
    pub fn open_positions(&self, symbol: &str) -> Vec<LivePosition> {
        self.with_symbol(symbol, |g| g.book().positions().cloned().collect())
    }

    /// Copies of the recent closed trades on `symbol`, at most
    /// [`CLOSED_TRADE_HISTORY`].
    pub fn closed_trades(&self, symbol: &str) -> Vec<Trade> {
        self.with_symbol(symbol, |g| g.book().closed_trades().cloned().collect())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }
}
