//! Decision engine — one evaluation cycle per signal, per symbol.
//!
//! Phases: `Idle → Evaluating → RiskChecked → Ranged → Ready → {Executed |
//! Rejected}`. The whole cycle runs under the symbol's live-book lock, so a
//! position watch on the same symbol waits for it. A forced close parked
//! while the cycle runs is applied between phases and rejects the decision.
//!
//! Business-rule rejections are data: they end up in
//! [`Decision::rejection_reason`], never in an `Err`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use tradegate_core::domain::{Bar, Direction, ReturnSeries, Side, Trade};
use tradegate_core::engine::{CostModel, SimulationConfig};
use tradegate_core::range::{PriceRange, RangeCalculator, RangeConfig};
use tradegate_core::risk::{Exposure, RiskConfig, RiskEngine, VolatilityRegime};
use tradegate_core::{CoreError, CoreResult};

use crate::live::{LiveBook, LivePosition, SymbolGuard};

// ─── Configuration ───────────────────────────────────────────────────

/// What to do when the natural target misses the minimum reward:risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardRiskPolicy {
    /// Push the target out, up to `max_volatility_multiple * ATR` from entry.
    WidenTarget { max_volatility_multiple: f64 },
    Reject,
}

impl Default for RewardRiskPolicy {
    fn default() -> Self {
        Self::WidenTarget {
            max_volatility_multiple: 6.0,
        }
    }
}

/// Local-time window in which new trades may open. `end` before `start`
/// wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TradingWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Half-open: `start` is inside, `end` is not.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Empty means trading is always allowed.
    pub trading_windows: Vec<TradingWindow>,
    /// Local time = UTC + this offset. Also decides what "today" is.
    pub utc_offset_minutes: i32,
    pub one_trade_per_day: bool,
    pub max_portfolio_var_pct: f64,
    pub min_reward_risk: f64,
    /// Base ATR multiple for the dynamic stop.
    pub stop_multiplier: f64,
    /// ATR multiple for the natural target.
    pub target_multiplier: f64,
    pub reward_risk_policy: RewardRiskPolicy,
    pub atr_period: usize,
}

impl DecisionConfig {
    pub fn validate(&self) -> CoreResult<()> {
        for w in &self.trading_windows {
            if w.start == w.end {
                return Err(CoreError::config(format!(
                    "trading window {} - {} is empty",
                    w.start, w.end
                )));
            }
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(CoreError::config(format!(
                "utc_offset_minutes must be within a day, got {}",
                self.utc_offset_minutes
            )));
        }
        if !(self.max_portfolio_var_pct > 0.0 && self.max_portfolio_var_pct <= 1.0) {
            return Err(CoreError::config(format!(
                "max_portfolio_var_pct must be in (0, 1], got {}",
                self.max_portfolio_var_pct
            )));
        }
        if !(self.min_reward_risk > 0.0) {
            return Err(CoreError::config(format!(
                "min_reward_risk must be > 0, got {}",
                self.min_reward_risk
            )));
        }
        if !(self.stop_multiplier > 0.0) || !(self.target_multiplier > 0.0) {
            return Err(CoreError::config(format!(
                "stop and target multipliers must be > 0, got {} and {}",
                self.stop_multiplier, self.target_multiplier
            )));
        }
        if let RewardRiskPolicy::WidenTarget {
            max_volatility_multiple,
        } = self.reward_risk_policy
        {
            if !(max_volatility_multiple > 0.0) {
                return Err(CoreError::config(format!(
                    "max_volatility_multiple must be > 0, got {max_volatility_multiple}"
                )));
            }
        }
        if self.atr_period == 0 {
            return Err(CoreError::config("decision atr_period must be >= 1"));
        }
        Ok(())
    }

    /// Local wall-clock time for `now`.
    pub fn local_time(&self, now: DateTime<Utc>) -> chrono::NaiveDateTime {
        (now + Duration::minutes(i64::from(self.utc_offset_minutes))).naive_utc()
    }

    pub fn in_trading_window(&self, now: DateTime<Utc>) -> bool {
        let t = self.local_time(now).time();
        self.trading_windows.is_empty() || self.trading_windows.iter().any(|w| w.contains(t))
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            trading_windows: Vec::new(),
            utc_offset_minutes: 0,
            one_trade_per_day: true,
            max_portfolio_var_pct: 0.02,
            min_reward_risk: 1.5,
            stop_multiplier: 2.0,
            target_multiplier: 3.0,
            reward_risk_policy: RewardRiskPolicy::default(),
            atr_period: 14,
        }
    }
}

// ─── Decision record ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionPhase {
    Idle,
    Evaluating,
    RiskChecked,
    Ranged,
    Ready,
    Executed,
    Rejected,
}

/// Outcome of one evaluation cycle. Never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// BLAKE3 of symbol, strategy and timestamp.
    pub id: String,
    pub symbol: String,
    pub strategy_id: String,
    /// Local trading date.
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub signal_direction: Direction,
    pub should_execute: bool,
    pub entry: Option<PriceRange>,
    pub stop: Option<PriceRange>,
    pub target: Option<PriceRange>,
    pub position_size: f64,
    pub confidence: f64,
    pub reward_risk: Option<f64>,
    pub regime: Option<VolatilityRegime>,
    pub phase: DecisionPhase,
    pub rejection_reason: Option<String>,
}

pub fn decision_id(symbol: &str, strategy_id: &str, timestamp: DateTime<Utc>) -> String {
    let key = format!("{symbol}|{strategy_id}|{}", timestamp.to_rfc3339());
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

impl Decision {
    fn pending(req: &DecisionRequest<'_>, date: NaiveDate) -> Self {
        Self {
            id: decision_id(req.symbol, req.strategy_id, req.now),
            symbol: req.symbol.to_string(),
            strategy_id: req.strategy_id.to_string(),
            date,
            timestamp: req.now,
            signal_direction: req.direction,
            should_execute: false,
            entry: None,
            stop: None,
            target: None,
            position_size: 0.0,
            confidence: req.confidence.clamp(0.0, 1.0),
            reward_risk: None,
            regime: None,
            phase: DecisionPhase::Idle,
            rejection_reason: None,
        }
    }

    fn reject(mut self, reason: impl Into<String>) -> Self {
        self.phase = DecisionPhase::Rejected;
        self.should_execute = false;
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn is_rejected(&self) -> bool {
        self.phase == DecisionPhase::Rejected
    }
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// Portfolio state the risk check sees, besides the symbol's own book.
#[derive(Debug, Clone, Default)]
pub struct PortfolioContext {
    /// Open exposures on other symbols. Entries for the evaluated symbol
    /// are replaced by its live book.
    pub positions: Vec<Exposure>,
    pub returns_by_key: BTreeMap<String, ReturnSeries>,
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionRequest<'a> {
    pub symbol: &'a str,
    pub strategy_id: &'a str,
    pub direction: Direction,
    pub confidence: f64,
    /// History up to and including the current bar.
    pub bars: &'a [Bar],
    pub now: DateTime<Utc>,
}

// ─── Engine ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: DecisionConfig,
    simulation: SimulationConfig,
    costs: CostModel,
    risk: RiskEngine,
    ranges: RangeCalculator,
}

/// Levels computed in the ranging phase.
struct Levels {
    stop_loss: f64,
    stop_distance: f64,
    target: f64,
    reward_risk: f64,
    atr: f64,
}

impl DecisionEngine {
    pub fn new(
        config: DecisionConfig,
        simulation: SimulationConfig,
        risk: RiskConfig,
        range: RangeConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        simulation.validate()?;
        let risk = RiskEngine::new(simulation.capital, risk)?;
        let ranges = RangeCalculator::new(range)?;
        let costs = simulation.costs();
        Ok(Self {
            config,
            simulation,
            costs,
            risk,
            ranges,
        })
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn risk(&self) -> &RiskEngine {
        &self.risk
    }

    /// Runs one decision cycle and, on success, opens the live trade.
    pub fn evaluate(
        &self,
        book: &LiveBook,
        req: DecisionRequest<'_>,
        ctx: &PortfolioContext,
    ) -> Decision {
        let date = self.config.local_time(req.now).date();
        let decision = book.with_symbol(req.symbol, |guard| {
            self.run_cycle(guard, &req, ctx, Decision::pending(&req, date))
        });
        info!(
            symbol = req.symbol,
            strategy = req.strategy_id,
            execute = decision.should_execute,
            phase = ?decision.phase,
            reason = decision.rejection_reason.as_deref().unwrap_or(""),
            "decision"
        );
        decision
    }

    fn run_cycle(
        &self,
        guard: &mut SymbolGuard<'_>,
        req: &DecisionRequest<'_>,
        ctx: &PortfolioContext,
        mut decision: Decision,
    ) -> Decision {
        decision.phase = DecisionPhase::Evaluating;

        if !self.config.in_trading_window(req.now) {
            return decision.reject("outside trading window");
        }
        if self.config.one_trade_per_day && guard.book().last_trade_date() == Some(decision.date)
        {
            return decision.reject("already traded today");
        }
        let Some(side) = req.direction.side() else {
            return decision.reject("flat signal");
        };
        if let Some(open) = guard.book().position(req.strategy_id) {
            if open.trade.side == side {
                return decision.reject("position already open");
            }
        }
        let Some(last) = req.bars.last() else {
            return decision.reject("no bars supplied");
        };
        let entry_price = last.close;

        let stop = match self.risk.dynamic_stop(
            req.bars,
            entry_price,
            side,
            self.config.atr_period,
            self.config.stop_multiplier,
        ) {
            Ok(s) => s,
            Err(e) => return decision.reject(e.to_string()),
        };
        decision.regime = Some(stop.regime);
        let quantity = match self.simulation.position_size(stop.distance) {
            Ok(q) => q,
            Err(e) => return decision.reject(e.to_string()),
        };
        decision.position_size = quantity;

        // Risk check
        let positions = portfolio_positions(guard, req, ctx);
        let proposed = Exposure::new(req.symbol, side.sign() * entry_price * quantity);
        let check = match self.risk.check_portfolio_risk_limits(
            &positions,
            &ctx.returns_by_key,
            &proposed,
            self.config.max_portfolio_var_pct,
            self.simulation.capital,
        ) {
            Ok(c) => c,
            Err(e) => return decision.reject(e.to_string()),
        };
        if !check.within_limits {
            let reason = check
                .reason
                .unwrap_or_else(|| "portfolio VaR limit exceeded".to_string());
            return decision.reject(reason);
        }
        decision.phase = DecisionPhase::RiskChecked;
        if guard.drain_pending() {
            return decision.reject("preempted by forced close");
        }

        // Ranging
        let levels = match self.levels(entry_price, side, stop.stop_loss, stop.distance, stop.atr) {
            Ok(l) => l,
            Err(reason) => return decision.reject(reason),
        };
        let band = |point: f64| {
            self.ranges.band(
                point,
                side.direction(),
                Some(levels.atr),
                self.ranges.config().range_multiplier,
            )
        };
        let (entry, stop_band, target) =
            match (band(entry_price), band(levels.stop_loss), band(levels.target)) {
                (Ok(e), Ok(s), Ok(t)) => (e, s, t),
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                    return decision.reject(e.to_string())
                }
            };
        decision.entry = Some(entry);
        decision.stop = Some(stop_band);
        decision.target = Some(target);
        decision.reward_risk = Some(levels.reward_risk);
        decision.phase = DecisionPhase::Ranged;
        if guard.drain_pending() {
            return decision.reject("preempted by forced close");
        }

        decision.phase = DecisionPhase::Ready;
        let fill = self.costs.entry_price(side, entry_price);
        let trade = Trade::open(
            req.symbol,
            req.strategy_id,
            side,
            req.now,
            fill,
            quantity,
            levels.stop_distance,
            self.costs.slippage_cost(entry_price, quantity),
        );
        let position = LivePosition {
            trade,
            stop_loss: levels.stop_loss,
            target: levels.target,
        };
        if let Some(reversed) = guard.open(position, entry_price, decision.date) {
            info!(
                symbol = req.symbol,
                strategy = req.strategy_id,
                pnl = reversed.pnl,
                "reversed open position"
            );
        }
        decision.should_execute = true;
        decision.phase = DecisionPhase::Executed;
        decision
    }

    /// Target placement under the reward:risk policy.
    fn levels(
        &self,
        entry: f64,
        side: Side,
        stop_loss: f64,
        stop_distance: f64,
        atr: f64,
    ) -> Result<Levels, String> {
        let min_rr = self.config.min_reward_risk;
        let natural = atr * self.config.target_multiplier;
        let needed = min_rr * stop_distance;
        // Ratios of equal ATR multiples can land a hair under the minimum.
        let target_distance = if natural + 1e-9 * stop_distance >= needed {
            natural
        } else {
            match self.config.reward_risk_policy {
                RewardRiskPolicy::WidenTarget {
                    max_volatility_multiple,
                } if needed <= atr * max_volatility_multiple => needed,
                RewardRiskPolicy::WidenTarget {
                    max_volatility_multiple,
                } => {
                    return Err(format!(
                        "reward:risk {:.2} below minimum {:.2} even at {:.1}x ATR",
                        natural / stop_distance,
                        min_rr,
                        max_volatility_multiple
                    ))
                }
                RewardRiskPolicy::Reject => {
                    return Err(format!(
                        "reward:risk {:.2} below minimum {:.2}",
                        natural / stop_distance,
                        min_rr
                    ))
                }
            }
        };
        Ok(Levels {
            stop_loss,
            stop_distance,
            target: entry + side.sign() * target_distance,
            reward_risk: target_distance / stop_distance,
            atr,
        })
    }
}

/// Exposures from `ctx` for other symbols, plus this symbol's live trades
/// except the one a reversal would close.
fn portfolio_positions(
    guard: &SymbolGuard<'_>,
    req: &DecisionRequest<'_>,
    ctx: &PortfolioContext,
) -> Vec<Exposure> {
    ctx.positions
        .iter()
        .filter(|e| e.key != req.symbol)
        .cloned()
        .chain(
            guard
                .book()
                .positions()
                .filter(|p| p.trade.strategy_id != req.strategy_id)
                .map(|p| Exposure::new(req.symbol, p.trade.signed_notional())),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tradegate_core::domain::PriceSeries;
    use tradegate_core::engine::StopModel;

    /// Closes alternate 100/102 with a 2-point range: true range is a
    /// constant 3, so ATR is 3 and the regime is normal.
    fn bars(n: usize) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = if i % 2 == 0 { 100.0 } else { 102.0 };
                Bar {
                    timestamp: base + Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    fn frictionless() -> SimulationConfig {
        SimulationConfig {
            commission_pct: 0.0,
            slippage_pct: 0.0,
            stop: StopModel::Fixed { distance: 2.0 },
            ..SimulationConfig::default()
        }
    }

    fn engine(config: DecisionConfig) -> DecisionEngine {
        DecisionEngine::new(
            config,
            frictionless(),
            RiskConfig::default(),
            RangeConfig::default(),
        )
        .unwrap()
    }

    fn windowed() -> DecisionConfig {
        DecisionConfig {
            trading_windows: vec![TradingWindow::new(
                NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            )],
            ..DecisionConfig::default()
        }
    }

    fn context(symbol: &str, bars: &[Bar]) -> PortfolioContext {
        let series = PriceSeries::new(symbol, bars.to_vec()).unwrap();
        PortfolioContext {
            positions: Vec::new(),
            returns_by_key: BTreeMap::from([(symbol.to_string(), series.close_returns())]),
        }
    }

    fn request<'a>(bars: &'a [Bar], direction: Direction, hour: u32) -> DecisionRequest<'a> {
        let day = bars.last().unwrap().timestamp;
        DecisionRequest {
            symbol: "SPY",
            strategy_id: "ensemble",
            direction,
            confidence: 0.8,
            bars,
            now: day + Duration::hours(i64::from(hour)),
        }
    }

    fn book() -> LiveBook {
        LiveBook::new(CostModel::frictionless())
    }

    #[test]
    fn trading_window_wraps_midnight() {
        let w = TradingWindow::new(
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
        );
        assert!(w.contains(NaiveTime::from_hms_opt(23, 0, 0).unwrap()));
        assert!(w.contains(NaiveTime::from_hms_opt(1, 0, 0).unwrap()));
        assert!(!w.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn invalid_config_rejected() {
        let bad = DecisionConfig {
            min_reward_risk: 0.0,
            ..DecisionConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = DecisionConfig {
            reward_risk_policy: RewardRiskPolicy::WidenTarget {
                max_volatility_multiple: -1.0,
            },
            ..DecisionConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(DecisionConfig::default().validate().is_ok());
    }

    #[test]
    fn outside_window_rejects_without_trade() {
        let bars = bars(60);
        let book = book();
        let d = engine(windowed()).evaluate(
            &book,
            request(&bars, Direction::Long, 3),
            &context("SPY", &bars),
        );
        assert!(!d.should_execute);
        assert_eq!(d.phase, DecisionPhase::Rejected);
        assert_eq!(d.rejection_reason.as_deref(), Some("outside trading window"));
        assert!(book.open_positions("SPY").is_empty());
    }

    #[test]
    fn long_signal_executes_and_opens_position() {
        let bars = bars(60);
        let book = book();
        let d = engine(windowed()).evaluate(
            &book,
            request(&bars, Direction::Long, 15),
            &context("SPY", &bars),
        );
        assert!(d.should_execute, "{:?}", d.rejection_reason);
        assert_eq!(d.phase, DecisionPhase::Executed);
        assert_eq!(d.regime, Some(VolatilityRegime::Normal));

        let entry = d.entry.unwrap();
        let stop = d.stop.unwrap();
        let target = d.target.unwrap();
        assert!((entry.point - 102.0).abs() < 1e-9);
        assert!((stop.point - 96.0).abs() < 1e-9);
        assert!((target.point - 111.0).abs() < 1e-9);
        assert!(entry.low < entry.point && entry.point < entry.high);
        assert!((d.position_size - 1_000.0 / 6.0).abs() < 1e-6);

        let open = book.open_positions("SPY");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].trade.side, Side::Long);
        assert!((open[0].stop_loss - 96.0).abs() < 1e-9);
    }

    #[test]
    fn second_trade_same_day_rejected() {
        let bars = bars(60);
        let book = book();
        let engine = engine(DecisionConfig::default());
        let ctx = context("SPY", &bars);
        assert!(engine.evaluate(&book, request(&bars, Direction::Long, 15), &ctx).should_execute);
        let again = engine.evaluate(&book, request(&bars, Direction::Short, 16), &ctx);
        assert_eq!(again.rejection_reason.as_deref(), Some("already traded today"));
    }

    #[test]
    fn same_direction_with_open_position_rejected() {
        let bars = bars(60);
        let book = book();
        let engine = engine(DecisionConfig {
            one_trade_per_day: false,
            ..DecisionConfig::default()
        });
        let ctx = context("SPY", &bars);
        assert!(engine.evaluate(&book, request(&bars, Direction::Long, 15), &ctx).should_execute);
        let again = engine.evaluate(&book, request(&bars, Direction::Long, 16), &ctx);
        assert_eq!(again.rejection_reason.as_deref(), Some("position already open"));
    }

    #[test]
    fn opposite_direction_reverses() {
        let bars = bars(60);
        let book = book();
        let engine = engine(DecisionConfig {
            one_trade_per_day: false,
            ..DecisionConfig::default()
        });
        let ctx = context("SPY", &bars);
        engine.evaluate(&book, request(&bars, Direction::Long, 15), &ctx);
        let d = engine.evaluate(&book, request(&bars, Direction::Short, 16), &ctx);
        assert!(d.should_execute, "{:?}", d.rejection_reason);
        let open = book.open_positions("SPY");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].trade.side, Side::Short);
        assert_eq!(book.closed_trades("SPY").len(), 1);
    }

    #[test]
    fn flat_signal_rejected() {
        let bars = bars(60);
        let d = engine(DecisionConfig::default()).evaluate(
            &book(),
            request(&bars, Direction::Flat, 15),
            &context("SPY", &bars),
        );
        assert_eq!(d.rejection_reason.as_deref(), Some("flat signal"));
    }

    #[test]
    fn risk_limit_breach_rejected_with_reason() {
        let bars = bars(60);
        let d = engine(DecisionConfig {
            max_portfolio_var_pct: 0.0001,
            ..DecisionConfig::default()
        })
        .evaluate(&book(), request(&bars, Direction::Long, 15), &context("SPY", &bars));
        assert!(!d.should_execute);
        assert!(d.rejection_reason.unwrap().contains("exceeds limit 0.01%"));
    }

    #[test]
    fn short_history_rejected_not_panicking() {
        let bars = bars(10);
        let d = engine(DecisionConfig::default()).evaluate(
            &book(),
            request(&bars, Direction::Long, 15),
            &context("SPY", &bars),
        );
        assert!(d.rejection_reason.unwrap().contains("insufficient data"));
    }

    #[test]
    fn target_widened_to_meet_min_reward_risk() {
        let bars = bars(60);
        let d = engine(DecisionConfig {
            min_reward_risk: 2.0,
            ..DecisionConfig::default()
        })
        .evaluate(&book(), request(&bars, Direction::Long, 15), &context("SPY", &bars));
        assert!(d.should_execute, "{:?}", d.rejection_reason);
        assert!((d.reward_risk.unwrap() - 2.0).abs() < 1e-9);
        assert!((d.target.unwrap().point - 114.0).abs() < 1e-9);
    }

    #[test]
    fn unreachable_reward_risk_rejected_under_both_policies() {
        let bars = bars(60);
        for policy in [RewardRiskPolicy::default(), RewardRiskPolicy::Reject] {
            let d = engine(DecisionConfig {
                min_reward_risk: 4.0,
                reward_risk_policy: policy,
                ..DecisionConfig::default()
            })
            .evaluate(&book(), request(&bars, Direction::Long, 15), &context("SPY", &bars));
            assert!(!d.should_execute);
            assert!(d.rejection_reason.unwrap().starts_with("reward:risk 1.50 below minimum 4.00"));
        }
    }

    #[test]
    fn decision_id_is_stable() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        assert_eq!(decision_id("SPY", "ensemble", ts), decision_id("SPY", "ensemble", ts));
        assert_ne!(decision_id("SPY", "ensemble", ts), decision_id("QQQ", "ensemble", ts));
        assert_eq!(decision_id("SPY", "ensemble", ts).len(), 64);
    }
}
