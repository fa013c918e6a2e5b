//! Trading desk — the scheduler-facing entry points.
//!
//! A scheduler calls [`TradingDesk::evaluate_all`] on the signal cadence,
//! [`TradingDesk::watch_all`] on every new bar, [`TradingDesk::force_close`]
//! on demand, and [`TradingDesk::recalibrate`] on the slow (daily) cadence.
//!
//! Each symbol has its own ensemble behind its own `RwLock`. Recalibration
//! computes performance on a cloned snapshot and takes the write lock only
//! to swap the new weights in, so evaluation never waits on a backtest.
//!
//! Record-log failures are logged and never undo or hide a state change:
//! a decision that opened a trade is still returned and alerted.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use tradegate_core::domain::{Bar, PriceSeries, Trade};
use tradegate_core::risk::Exposure;
use tradegate_core::strategy::{StrategyParams, StrategyRegistry};

use crate::alerts::{Alert, AlertSink, TracingSink};
use crate::config::{ConfigFingerprint, DeskConfig};
use crate::decision::{Decision, DecisionEngine, DecisionRequest, PortfolioContext};
use crate::ensemble::EnsembleTracker;
use crate::error::{RunnerError, RunnerResult};
use crate::history::{Record, RecordLog};
use crate::live::LiveBook;
use crate::optimization::RankedParameters;

/// Strategy id recorded on decisions driven by the ensemble vote.
pub const ENSEMBLE_ID: &str = "ensemble";

type SharedTracker = Arc<RwLock<EnsembleTracker>>;

pub struct TradingDesk {
    config: DeskConfig,
    fingerprint: ConfigFingerprint,
    registry: StrategyRegistry,
    engine: DecisionEngine,
    book: LiveBook,
    ensembles: RwLock<BTreeMap<String, SharedTracker>>,
    log: Option<RecordLog>,
    sink: Arc<dyn AlertSink>,
}

impl TradingDesk {
    pub fn new(config: DeskConfig, registry: StrategyRegistry) -> RunnerResult<Self> {
        config.validate()?;
        if registry.is_empty() {
            return Err(RunnerError::InvalidData("strategy registry is empty".into()));
        }
        let engine = DecisionEngine::new(
            config.decision.clone(),
            config.simulation.clone(),
            config.risk.clone(),
            config.range.clone(),
        )?;
        let book = LiveBook::new(config.simulation.costs());
        let fingerprint = config.fingerprint()?;
        Ok(Self {
            config,
            fingerprint,
            registry,
            engine,
            book,
            ensembles: RwLock::new(BTreeMap::new()),
            log: None,
            sink: Arc::new(TracingSink),
        })
    }

    /// Persists records to `log`, stamped with this desk's config fingerprint.
    pub fn with_record_log(mut self, log: RecordLog) -> Self {
        self.log = Some(log.with_fingerprint(self.fingerprint.clone()));
        self
    }

    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn book(&self) -> &LiveBook {
        &self.book
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// The symbol's ensemble, created equally weighted on first use.
    pub fn ensemble(&self, symbol: &str) -> RunnerResult<SharedTracker> {
        if let Some(t) = self.ensembles.read().get(symbol) {
            return Ok(Arc::clone(t));
        }
        let mut map = self.ensembles.write();
        if let Some(t) = map.get(symbol) {
            return Ok(Arc::clone(t));
        }
        let tracker = EnsembleTracker::new(
            self.registry.clone(),
            self.config.ensemble.clone(),
            self.config.simulation.clone(),
        )?;
        let shared = Arc::new(RwLock::new(tracker));
        map.insert(symbol.to_string(), Arc::clone(&shared));
        Ok(shared)
    }

    /// Weights of the symbol's ensemble.
    pub fn weights(&self, symbol: &str) -> RunnerResult<BTreeMap<String, f64>> {
        Ok(self.ensemble(symbol)?.read().weights().clone())
    }

    // ─── Evaluation ──────────────────────────────────────────────────

    /// One decision per symbol from the ensemble vote on its latest bars.
    /// Symbols run in parallel; one symbol's failure never stops the others.
    pub fn evaluate_all(
        &self,
        market: &BTreeMap<String, PriceSeries>,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, RunnerResult<Decision>> {
        let ctx = self.portfolio_context(market);
        let results: Vec<(String, RunnerResult<Decision>)> = market
            .par_iter()
            .map(|(symbol, series)| {
                (symbol.clone(), self.evaluate_symbol(symbol, series, &ctx, now))
            })
            .collect();
        for (symbol, result) in &results {
            if let Err(e) = result {
                warn!(symbol = %symbol, error = %e, "evaluation failed");
            }
        }
        results.into_iter().collect()
    }

    fn evaluate_symbol(
        &self,
        symbol: &str,
        series: &PriceSeries,
        ctx: &PortfolioContext,
        now: DateTime<Utc>,
    ) -> RunnerResult<Decision> {
        let vote = self.ensemble(symbol)?.read().ensemble_signal(series.bars())?;
        debug!(symbol, signal = ?vote.signal, confidence = vote.confidence, "ensemble vote");
        let decision = self.engine.evaluate(
            &self.book,
            DecisionRequest {
                symbol,
                strategy_id: ENSEMBLE_ID,
                direction: vote.signal,
                confidence: vote.confidence,
                bars: series.bars(),
                now,
            },
            ctx,
        );
        self.persist(&[Record::from(decision.clone())]);
        if !decision.signal_direction.is_flat() {
            self.sink.send(&Alert::from_decision(&decision));
        }
        Ok(decision)
    }

    /// Open live exposure on every known symbol and the return series the
    /// market supplies.
    fn portfolio_context(&self, market: &BTreeMap<String, PriceSeries>) -> PortfolioContext {
        let positions = self
            .book
            .symbols()
            .into_iter()
            .flat_map(|symbol| {
                self.book
                    .open_positions(&symbol)
                    .into_iter()
                    .map(move |p| Exposure::new(symbol.clone(), p.trade.signed_notional()))
                    .collect::<Vec<_>>()
            })
            .collect();
        let returns_by_key = market
            .iter()
            .map(|(symbol, series)| (symbol.clone(), series.close_returns()))
            .collect();
        PortfolioContext {
            positions,
            returns_by_key,
        }
    }

    // ─── Position management ─────────────────────────────────────────

    /// Checks stops and targets against each symbol's latest bar.
    pub fn watch_all(&self, latest: &BTreeMap<String, Bar>) -> Vec<Trade> {
        let closed: Vec<Trade> = latest
            .iter()
            .flat_map(|(symbol, bar)| self.book.watch_position(symbol, bar))
            .collect();
        self.persist_trades(&closed);
        closed
    }

    /// Closes every open trade on `symbol` at `price`. A symbol without
    /// open trades is a no-op.
    pub fn force_close(&self, symbol: &str, price: f64, now: DateTime<Utc>) -> Vec<Trade> {
        let closed = self.book.force_close(symbol, price, now);
        if !closed.is_empty() {
            self.sink.send(&Alert::forced_close(symbol, price, closed.len()));
            self.persist_trades(&closed);
        }
        closed
    }

    // ─── Recalibration ───────────────────────────────────────────────

    /// Rebalances every due ensemble from its symbol's history. Returns the
    /// new weights of the symbols that were rebalanced.
    pub fn recalibrate(
        &self,
        market: &BTreeMap<String, PriceSeries>,
        now: DateTime<Utc>,
    ) -> RunnerResult<BTreeMap<String, BTreeMap<String, f64>>> {
        let mut out = BTreeMap::new();
        for (symbol, series) in market {
            let shared = self.ensemble(symbol)?;
            let snapshot = shared.read().clone();
            if !snapshot.should_rebalance(now) {
                debug!(symbol = %symbol, "rebalance not due");
                continue;
            }
            let performance = snapshot.calculate_strategy_performance(symbol, series.bars())?;
            let weights = shared.write().rebalance_strategies(
                performance,
                self.config.ensemble.weighting,
                now,
            );
            let records: Vec<Record> = shared
                .read()
                .performance()
                .values()
                .cloned()
                .map(Record::from)
                .collect();
            self.persist(&records);
            info!(symbol = %symbol, ?weights, "recalibrated");
            out.insert(symbol.clone(), weights);
        }
        Ok(out)
    }

    /// Installs the optimizer's top-ranked parameters for one strategy of
    /// one symbol's ensemble.
    pub fn apply_parameters(
        &self,
        symbol: &str,
        strategy_id: &str,
        ranked: &[RankedParameters],
    ) -> RunnerResult<Option<StrategyParams>> {
        self.ensemble(symbol)?
            .write()
            .apply_parameters(strategy_id, ranked)
    }

    // ─── Persistence ─────────────────────────────────────────────────

    fn persist(&self, records: &[Record]) {
        let Some(log) = &self.log else {
            return;
        };
        if let Err(e) = log.append_all(records) {
            warn!(
                path = %log.path().display(),
                records = records.len(),
                error = %e,
                "failed to persist records"
            );
        }
    }

    fn persist_trades(&self, trades: &[Trade]) {
        let records: Vec<Record> = trades.iter().cloned().map(Record::from).collect();
        self.persist(&records);
    }
}
