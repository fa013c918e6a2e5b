//! Strategy ensemble — rolling per-strategy performance, selection,
//! weighting and weighted signal votes.
//!
//! Performance is computed on a snapshot (`&self`); weights change only in
//! [`EnsembleTracker::rebalance_strategies`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use tradegate_core::domain::{Bar, Direction, PriceSeries, Signal};
use tradegate_core::engine::{SimulationConfig, TradeSimulator};
use tradegate_core::strategy::{StrategyParams, StrategyRegistry};
use tradegate_core::{CoreError, CoreResult};

use crate::error::{RunnerError, RunnerResult};
use crate::metrics::PerformanceEvaluator;
use crate::optimization::{top_ranked, RankedParameters};

// ─── Configuration ───────────────────────────────────────────────────

/// How rebalancing turns performance into weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMethod {
    /// Proportional to positive Sharpe; negative Sharpe gets 0.
    SharpeProportional,
    /// Equal weight across every strategy that is not disabled.
    Equal,
}

/// Metric used to rank strategies for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMetric {
    Sharpe,
    WinRate,
    TotalReturn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Rolling window in bars.
    pub lookback_bars: usize,
    /// Strategies with fewer trades in the window are left out of weighting.
    pub min_trades: usize,
    pub selection_metric: SelectionMetric,
    pub rebalance_frequency_days: i64,
    /// Strategies with Sharpe below this get weight 0 when `auto_disable`.
    pub performance_threshold: f64,
    pub auto_disable: bool,
    pub weighting: WeightingMethod,
    pub bars_per_year: f64,
}

impl EnsembleConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.lookback_bars < 2 {
            return Err(CoreError::config(format!(
                "ensemble lookback_bars must be >= 2, got {}",
                self.lookback_bars
            )));
        }
        if self.rebalance_frequency_days < 0 {
            return Err(CoreError::config(format!(
                "rebalance_frequency_days must be >= 0, got {}",
                self.rebalance_frequency_days
            )));
        }
        if !(self.bars_per_year > 0.0) {
            return Err(CoreError::config(format!(
                "bars_per_year must be > 0, got {}",
                self.bars_per_year
            )));
        }
        Ok(())
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            lookback_bars: 90,
            min_trades: 5,
            selection_metric: SelectionMetric::Sharpe,
            rebalance_frequency_days: 7,
            performance_threshold: 0.0,
            auto_disable: true,
            weighting: WeightingMethod::SharpeProportional,
            bars_per_year: 252.0,
        }
    }
}

// ─── Records ─────────────────────────────────────────────────────────

/// Rolling-window performance of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformance {
    pub strategy_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub sharpe: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub weight: f64,
}

impl StrategyPerformance {
    fn metric(&self, metric: SelectionMetric) -> f64 {
        match metric {
            SelectionMetric::Sharpe => self.sharpe,
            SelectionMetric::WinRate => self.win_rate,
            SelectionMetric::TotalReturn => self.total_return,
        }
    }
}

/// Weighted vote across strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSignal {
    pub signal: Direction,
    /// `|sum(w * d)| / sum(|w|)`, in `[0, 1]`.
    pub confidence: f64,
    /// Per-strategy `weight * direction`.
    pub votes: BTreeMap<String, f64>,
}

// ─── Pure functions ──────────────────────────────────────────────────

/// True when at least `frequency_days` have passed since the last rebalance,
/// or there has never been one.
pub fn should_rebalance(
    last_rebalance: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    frequency_days: i64,
) -> bool {
    match last_rebalance {
        None => true,
        Some(last) => now - last >= Duration::days(frequency_days),
    }
}

/// Weighted vote. Strategies without a weight vote with weight 0.
pub fn aggregate_signals(
    signals: &BTreeMap<String, Signal>,
    weights: &BTreeMap<String, f64>,
) -> EnsembleSignal {
    let mut votes = BTreeMap::new();
    let mut sum = 0.0;
    let mut total_weight = 0.0;
    for (id, signal) in signals {
        let w = weights.get(id).copied().unwrap_or(0.0);
        let vote = w * signal.direction.sign();
        sum += vote;
        total_weight += w.abs();
        votes.insert(id.clone(), vote);
    }
    let confidence = if total_weight > 0.0 {
        (sum.abs() / total_weight).min(1.0)
    } else {
        0.0
    };
    EnsembleSignal {
        signal: Direction::from_sign(sum),
        confidence,
        votes,
    }
}

/// Ids meeting `min_trades`, best `metric` first, ties by id.
pub fn select_strategies(
    performance: &BTreeMap<String, StrategyPerformance>,
    metric: SelectionMetric,
    min_trades: usize,
) -> Vec<String> {
    let mut eligible: Vec<&StrategyPerformance> = performance
        .values()
        .filter(|p| p.trade_count >= min_trades)
        .collect();
    eligible.sort_by(|a, b| {
        b.metric(metric)
            .total_cmp(&a.metric(metric))
            .then_with(|| a.strategy_id.cmp(&b.strategy_id))
    });
    eligible.into_iter().map(|p| p.strategy_id.clone()).collect()
}

/// New weights for `performance`, summing to 1 unless every weight is 0.
pub fn compute_weights(
    performance: &BTreeMap<String, StrategyPerformance>,
    method: WeightingMethod,
    config: &EnsembleConfig,
) -> BTreeMap<String, f64> {
    let raw: BTreeMap<String, f64> = performance
        .iter()
        .map(|(id, p)| {
            let disabled = config.auto_disable && p.sharpe < config.performance_threshold;
            let w = if disabled {
                0.0
            } else {
                match method {
                    WeightingMethod::SharpeProportional => {
                        if p.sharpe.is_finite() {
                            p.sharpe.max(0.0)
                        } else {
                            0.0
                        }
                    }
                    WeightingMethod::Equal => 1.0,
                }
            };
            (id.clone(), w)
        })
        .collect();
    let total: f64 = raw.values().sum();
    raw.into_iter()
        .map(|(id, w)| (id, if total > 0.0 { w / total } else { 0.0 }))
        .collect()
}

// ─── Tracker ─────────────────────────────────────────────────────────

/// Per-symbol strategy ensemble.
#[derive(Debug, Clone)]
pub struct EnsembleTracker {
    registry: StrategyRegistry,
    config: EnsembleConfig,
    simulation: SimulationConfig,
    params: BTreeMap<String, StrategyParams>,
    weights: BTreeMap<String, f64>,
    performance: BTreeMap<String, StrategyPerformance>,
    last_rebalance: Option<DateTime<Utc>>,
}

impl EnsembleTracker {
    /// Tracker over every strategy in `registry`, equally weighted.
    pub fn new(
        registry: StrategyRegistry,
        config: EnsembleConfig,
        simulation: SimulationConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        simulation.validate()?;
        let n = registry.len();
        let mut params = BTreeMap::new();
        let mut weights = BTreeMap::new();
        for id in registry.ids() {
            if let Some(s) = registry.get(id) {
                params.insert(id.to_string(), s.default_params());
            }
            weights.insert(id.to_string(), 1.0 / n as f64);
        }
        Ok(Self {
            registry,
            config,
            simulation,
            params,
            weights,
            performance: BTreeMap::new(),
            last_rebalance: None,
        })
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn performance(&self) -> &BTreeMap<String, StrategyPerformance> {
        &self.performance
    }

    pub fn last_rebalance(&self) -> Option<DateTime<Utc>> {
        self.last_rebalance
    }

    pub fn params(&self, strategy_id: &str) -> Option<&StrategyParams> {
        self.params.get(strategy_id)
    }

    /// Bars needed by [`Self::calculate_strategy_performance`].
    pub fn required_bars(&self) -> usize {
        self.config.lookback_bars + self.simulation.stop.warmup_bars()
    }

    /// Simulates every strategy over the last `lookback_bars` bars.
    ///
    /// Signals are computed on the full history so strategy warmup does not
    /// eat into the window. Runs strategies in parallel.
    pub fn calculate_strategy_performance(
        &self,
        symbol: &str,
        bars: &[Bar],
    ) -> RunnerResult<BTreeMap<String, StrategyPerformance>> {
        let needed = self.required_bars();
        if bars.len() < needed {
            let err = CoreError::insufficient("strategy performance window", needed, bars.len());
            return Err(err.into());
        }
        let start = bars.len() - self.config.lookback_bars;
        let window = PriceSeries::new(symbol, bars[start..].to_vec())?;
        let stops = self.simulation.stop.distances(bars);
        let simulator = TradeSimulator::new(self.simulation.clone())?;
        let evaluator = PerformanceEvaluator::new(self.config.bars_per_year);

        let ids: Vec<&str> = self.registry.ids().collect();
        let results: Vec<RunnerResult<StrategyPerformance>> = ids
            .par_iter()
            .map(|&id| {
                let strategy = self
                    .registry
                    .get(id)
                    .ok_or_else(|| RunnerError::UnknownStrategy(id.to_string()))?;
                let params = self
                    .params
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| strategy.default_params());
                let signals = strategy.compute(bars, &params)?;
                let result =
                    simulator.simulate_with_stops(id, &window, &signals[start..], &stops[start..])?;
                let m = evaluator.evaluate(&result.trades, &result.equity_curve);
                Ok(StrategyPerformance {
                    strategy_id: id.to_string(),
                    window_start: bars[start].timestamp,
                    window_end: bars[bars.len() - 1].timestamp,
                    sharpe: m.sharpe,
                    win_rate: m.win_rate,
                    trade_count: m.trade_count,
                    total_return: m.total_return,
                    max_drawdown: m.max_drawdown,
                    weight: self.weights.get(id).copied().unwrap_or(0.0),
                })
            })
            .collect();

        results
            .into_iter()
            .map(|r| r.map(|p| (p.strategy_id.clone(), p)))
            .collect()
    }

    /// Ranked ids from the last recorded performance snapshot.
    pub fn auto_select_strategies(
        &self,
        metric: SelectionMetric,
        min_trades: usize,
    ) -> Vec<String> {
        select_strategies(&self.performance, metric, min_trades)
    }

    pub fn should_rebalance(&self, now: DateTime<Utc>) -> bool {
        should_rebalance(self.last_rebalance, now, self.config.rebalance_frequency_days)
    }

    /// Replaces weights from `performance`. Only strategies picked by
    /// [`Self::auto_select_strategies`] under the configured metric and
    /// `min_trades` are weighted; the rest, and strategies missing from the
    /// snapshot, get weight 0. Returns the new weights.
    pub fn rebalance_strategies(
        &mut self,
        performance: BTreeMap<String, StrategyPerformance>,
        method: WeightingMethod,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, f64> {
        self.performance = performance;
        let selected =
            self.auto_select_strategies(self.config.selection_metric, self.config.min_trades);
        let eligible: BTreeMap<String, StrategyPerformance> = self
            .performance
            .iter()
            .filter(|(id, _)| selected.contains(id))
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect();
        let computed = compute_weights(&eligible, method, &self.config);
        let mut weights: BTreeMap<String, f64> =
            self.registry.ids().map(|id| (id.to_string(), 0.0)).collect();
        for (id, w) in &computed {
            weights.insert(id.clone(), *w);
        }
        for (id, p) in self.performance.iter_mut() {
            p.weight = weights.get(id).copied().unwrap_or(0.0);
        }
        let disabled = weights.values().filter(|w| **w == 0.0).count();
        info!(
            strategies = weights.len(),
            selected = selected.len(),
            disabled,
            method = ?method,
            "rebalanced ensemble"
        );
        self.weights = weights.clone();
        self.last_rebalance = Some(now);
        weights
    }

    /// Installs the top-ranked parameter set for `strategy_id`.
    ///
    /// Returns the installed parameters, or `None` when `ranked` has no
    /// usable candidate.
    pub fn apply_parameters(
        &mut self,
        strategy_id: &str,
        ranked: &[RankedParameters],
    ) -> RunnerResult<Option<StrategyParams>> {
        let strategy = self
            .registry
            .get(strategy_id)
            .ok_or_else(|| RunnerError::UnknownStrategy(strategy_id.to_string()))?;
        let Some(best) = top_ranked(ranked) else {
            return Ok(None);
        };
        let params = best.parameters.merged_over(&strategy.default_params());
        strategy.warmup_bars(&params)?;
        info!(strategy = strategy_id, score = best.score, "applied optimized parameters");
        self.params.insert(strategy_id.to_string(), params.clone());
        Ok(Some(params))
    }

    /// Latest signal of every registered strategy.
    pub fn latest_signals(&self, bars: &[Bar]) -> RunnerResult<BTreeMap<String, Signal>> {
        let mut out = BTreeMap::new();
        let Some(last) = bars.last() else {
            return Ok(out);
        };
        for id in self.registry.ids() {
            let strategy = self
                .registry
                .get(id)
                .ok_or_else(|| RunnerError::UnknownStrategy(id.to_string()))?;
            let params = self
                .params
                .get(id)
                .cloned()
                .unwrap_or_else(|| strategy.default_params());
            let signal = strategy
                .compute(bars, &params)?
                .pop()
                .unwrap_or_else(|| Signal::flat(last.timestamp));
            out.insert(id.to_string(), signal);
        }
        Ok(out)
    }

    /// Weighted vote of the latest signals under the current weights.
    pub fn ensemble_signal(&self, bars: &[Bar]) -> RunnerResult<EnsembleSignal> {
        Ok(aggregate_signals(&self.latest_signals(bars)?, &self.weights))
    }
}
