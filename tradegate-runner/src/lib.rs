//! Tradegate Runner — evaluation, ensembles, live decisions, persistence.
//!
//! This crate builds on `tradegate-core` to provide:
//! - Performance evaluation (Sharpe, Sortino, Calmar, drawdown, trade stats)
//! - Per-symbol strategy ensembles with rolling performance and rebalancing
//! - The decision state machine and the per-symbol live book
//! - Desk configuration, JSONL record log, alerts and CSV I/O
//! - Scheduler entry points on [`TradingDesk`]

pub mod alerts;
pub mod config;
pub mod data_loader;
pub mod decision;
pub mod desk;
pub mod ensemble;
pub mod error;
pub mod export;
pub mod history;
pub mod live;
pub mod metrics;
pub mod optimization;

pub use alerts::{Alert, AlertSink, MemorySink, Severity, TracingSink};
pub use config::{ConfigFingerprint, DeskConfig};
pub use data_loader::{
    load_bars_csv, load_signals_csv, read_bars, read_signals, synthetic_bars, synthetic_series,
};
pub use decision::{
    Decision, DecisionConfig, DecisionEngine, DecisionPhase, DecisionRequest, PortfolioContext,
    RewardRiskPolicy, TradingWindow,
};
pub use desk::{TradingDesk, ENSEMBLE_ID};
pub use ensemble::{
    aggregate_signals, compute_weights, select_strategies, should_rebalance, EnsembleConfig,
    EnsembleSignal, EnsembleTracker, SelectionMetric, StrategyPerformance, WeightingMethod,
};
pub use error::{RunnerError, RunnerResult};
pub use export::{equity_csv, trades_csv, write_trades_csv};
pub use history::{Record, RecordEntry, RecordLog};
pub use live::{LiveBook, LivePosition, SymbolBook, SymbolGuard};
pub use metrics::{Metrics, PerformanceEvaluator};
pub use optimization::{top_ranked, RankedParameters};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn metrics_is_send_sync() {
        assert_send::<Metrics>();
        assert_sync::<Metrics>();
    }

    #[test]
    fn shared_state_is_send_sync() {
        assert_send::<LiveBook>();
        assert_sync::<LiveBook>();
        assert_send::<EnsembleTracker>();
        assert_sync::<EnsembleTracker>();
        assert_send::<TradingDesk>();
        assert_sync::<TradingDesk>();
    }

    #[test]
    fn records_are_send_sync() {
        assert_send::<Decision>();
        assert_sync::<Decision>();
        assert_send::<Record>();
        assert_sync::<Record>();
        assert_send::<DeskConfig>();
        assert_sync::<DeskConfig>();
    }

    #[test]
    fn engine_is_send_sync() {
        assert_send::<DecisionEngine>();
        assert_sync::<DecisionEngine>();
        assert_send::<RunnerError>();
        assert_sync::<RunnerError>();
    }
}
