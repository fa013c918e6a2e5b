//! Tradegate CLI — simulation, risk, decision and recalibration commands.
//!
//! Commands:
//! - `simulate` — replay a strategy (or a signal CSV) over one symbol and
//!   print performance metrics
//! - `risk` — VaR, Expected Shortfall and correlations across symbols
//! - `decide` — run one decision cycle for a symbol
//! - `recalibrate` — rebalance ensemble weights from recent history
//! - `demo` — the whole loop on synthetic data
//!
//! Market data comes from `--data SYMBOL=PATH` CSV files or from
//! `--synthetic SYMBOL` seeded random walks.

mod obs;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use tradegate_core::domain::{Direction, PriceSeries, Signal};
use tradegate_core::engine::TradeSimulator;
use tradegate_core::risk::{Exposure, RiskEngine};
use tradegate_core::strategy::{StrategyParams, StrategyRegistry};
use tradegate_runner::{
    load_bars_csv, load_signals_csv, synthetic_series, write_trades_csv, DecisionRequest,
    DeskConfig, Metrics, PerformanceEvaluator, PortfolioContext, RecordLog, TradingDesk,
};

#[derive(Parser)]
#[command(name = "tradegate", about = "Tradegate — trade simulation, risk and decision engine")]
struct Cli {
    /// Log filter used when TRADEGATE_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Desk configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct MarketArgs {
    /// CSV bars per symbol, as SYMBOL=PATH. Repeatable.
    #[arg(long = "data")]
    data: Vec<String>,

    /// Symbols to generate synthetic bars for. Repeatable.
    #[arg(long = "synthetic")]
    synthetic: Vec<String>,

    /// Number of synthetic bars per symbol.
    #[arg(long, default_value_t = 500)]
    bars: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum SignalArg {
    Long,
    Short,
    Flat,
}

impl From<SignalArg> for Direction {
    fn from(s: SignalArg) -> Self {
        match s {
            SignalArg::Long => Direction::Long,
            SignalArg::Short => Direction::Short,
            SignalArg::Flat => Direction::Flat,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one strategy over one symbol and print metrics.
    Simulate {
        #[command(flatten)]
        market: MarketArgs,

        /// Registered strategy id: ma_crossover, donchian_breakout, momentum.
        #[arg(long, default_value = "ma_crossover")]
        strategy: String,

        /// Strategy parameter override, as NAME=VALUE. Repeatable.
        #[arg(long = "param")]
        params: Vec<String>,

        /// Signal CSV to replay instead of a strategy.
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Write the trade list here as CSV.
        #[arg(long)]
        trades_out: Option<PathBuf>,
    },
    /// Per-symbol VaR/ES, correlations and optional portfolio VaR.
    Risk {
        #[command(flatten)]
        market: MarketArgs,

        /// VaR confidence level.
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,

        /// Position notional, as SYMBOL=NOTIONAL (negative for short). Repeatable.
        #[arg(long = "position")]
        positions: Vec<String>,
    },
    /// Run one decision cycle for a symbol.
    Decide {
        #[command(flatten)]
        market: MarketArgs,

        /// Symbol to decide on.
        #[arg(long)]
        symbol: String,

        /// Signal direction. Omit to use the ensemble vote.
        #[arg(long, value_enum)]
        signal: Option<SignalArg>,

        /// Decision time (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Append the decision to this JSONL record log.
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Rebalance ensemble weights for every symbol.
    Recalibrate {
        #[command(flatten)]
        market: MarketArgs,

        /// Append strategy performance to this JSONL record log.
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Recalibrate, evaluate and watch positions on synthetic data.
    Demo {
        /// Synthetic symbols.
        #[arg(long, default_values = ["SPY", "QQQ", "IWM"])]
        symbols: Vec<String>,

        #[arg(long, default_value_t = 400)]
        bars: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, &cli.log_format)?;

    let config = match &cli.config {
        Some(path) => DeskConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DeskConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            market,
            strategy,
            params,
            signals,
            trades_out,
        } => run_simulate(&config, &market, &strategy, &params, signals, trades_out),
        Commands::Risk {
            market,
            confidence,
            positions,
        } => run_risk(&config, &market, confidence, &positions),
        Commands::Decide {
            market,
            symbol,
            signal,
            at,
            records,
        } => run_decide(config, &market, &symbol, signal, at.as_deref(), records),
        Commands::Recalibrate { market, records } => run_recalibrate(config, &market, records),
        Commands::Demo { symbols, bars } => run_demo(config, &symbols, bars),
    }
}

// ─── Input helpers ───────────────────────────────────────────────────

fn synthetic_start() -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2020, 1, 1).context("invalid synthetic start date")
}

fn load_market(args: &MarketArgs) -> Result<BTreeMap<String, PriceSeries>> {
    let mut market = BTreeMap::new();
    for spec in &args.data {
        let (symbol, path) = spec
            .split_once('=')
            .with_context(|| format!("--data expects SYMBOL=PATH, got '{spec}'"))?;
        let series = load_bars_csv(symbol, path.as_ref())
            .with_context(|| format!("loading bars for {symbol} from {path}"))?;
        market.insert(symbol.to_string(), series);
    }
    for symbol in &args.synthetic {
        market.insert(symbol.clone(), synthetic_series(symbol, synthetic_start()?, args.bars)?);
    }
    if market.is_empty() {
        bail!("no market data: pass --data SYMBOL=PATH or --synthetic SYMBOL");
    }
    Ok(market)
}

fn parse_pair(spec: &str, flag: &str) -> Result<(String, f64)> {
    let (name, value) = spec
        .split_once('=')
        .with_context(|| format!("{flag} expects NAME=VALUE, got '{spec}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("{flag}: '{value}' is not a number"))?;
    Ok((name.trim().to_string(), value))
}

fn print_metrics(m: &Metrics) {
    println!("  Trades:          {}", m.trade_count);
    println!("  Total return:    {:.2}%", m.total_return * 100.0);
    println!("  CAGR:            {:.2}%", m.cagr * 100.0);
    println!("  Sharpe:          {:.3}", m.sharpe);
    println!("  Sortino:         {:.3}", m.sortino);
    println!("  Calmar:          {:.3}", m.calmar);
    println!("  Max drawdown:    {:.2}%", m.max_drawdown * 100.0);
    println!("  Win rate:        {:.1}%", m.win_rate * 100.0);
    println!("  Profit factor:   {:.3}", m.profit_factor);
    println!("  Expectancy (R):  {:.3}", m.expectancy);
}

// ─── Commands ────────────────────────────────────────────────────────

fn run_simulate(
    config: &DeskConfig,
    market: &MarketArgs,
    strategy_id: &str,
    overrides: &[String],
    signals_path: Option<PathBuf>,
    trades_out: Option<PathBuf>,
) -> Result<()> {
    let market = load_market(market)?;
    if market.len() != 1 {
        bail!("simulate takes exactly one symbol, got {}", market.len());
    }
    let Some(series) = market.values().next() else {
        bail!("no market data");
    };

    let signals: Vec<Signal> = match signals_path {
        Some(path) => load_signals_csv(&path)?,
        None => {
            let registry = StrategyRegistry::with_builtins();
            let Some(strategy) = registry.get(strategy_id) else {
                bail!(
                    "unknown strategy '{strategy_id}'; available: {}",
                    registry.ids().collect::<Vec<_>>().join(", ")
                );
            };
            let mut params = StrategyParams::new();
            for spec in overrides {
                let (name, value) = parse_pair(spec, "--param")?;
                params = params.with(&name, value);
            }
            let params = params.merged_over(&strategy.default_params());
            strategy.compute(series.bars(), &params)?
        }
    };

    let simulator = TradeSimulator::new(config.simulation.clone())?;
    let result = simulator.simulate(strategy_id, series, &signals)?;
    let metrics = PerformanceEvaluator::default().evaluate(&result.trades, &result.equity_curve);

    println!("Simulation: {} / {strategy_id} ({} bars)", series.symbol(), series.len());
    print_metrics(&metrics);
    if let Some(equity) = result.final_equity() {
        println!("  Final equity:    {equity:.2}");
    }
    if let Some(path) = trades_out {
        write_trades_csv(&path, &result.trades)?;
        println!("Trades written to {}", path.display());
    }
    Ok(())
}

fn run_risk(
    config: &DeskConfig,
    market: &MarketArgs,
    confidence: f64,
    positions: &[String],
) -> Result<()> {
    let market = load_market(market)?;
    let engine = RiskEngine::new(config.simulation.capital, config.risk.clone())?;
    let returns_by_key: BTreeMap<_, _> = market
        .iter()
        .map(|(s, series)| (s.clone(), series.close_returns()))
        .collect();

    println!("Per-unit-capital risk at {:.1}% confidence:", confidence * 100.0);
    for (symbol, returns) in &returns_by_key {
        let values: Vec<f64> = returns.values().copied().collect();
        let hist = engine.var_historical(&values, confidence)?;
        let param = engine.var_parametric(&values, confidence)?;
        let es = engine.expected_shortfall(&values, confidence)?;
        println!(
            "  {symbol:<8} hist VaR {:>10.2}  param VaR {:>10.2}  ES {:>10.2}",
            hist.var_amount,
            param.var_amount,
            es.es_amount.unwrap_or(f64::NAN)
        );
    }

    let matrix = engine.correlation_matrix(&returns_by_key)?;
    println!("Correlations:");
    for (i, a) in matrix.keys.iter().enumerate() {
        let row: Vec<String> = matrix.values[i].iter().map(|v| format!("{v:>6.2}")).collect();
        println!("  {a:<8} {}", row.join(" "));
    }
    for w in &matrix.warnings {
        println!("  warning: {w}");
    }

    if !positions.is_empty() {
        let exposures = positions
            .iter()
            .map(|spec| parse_pair(spec, "--position").map(|(k, n)| Exposure::new(k, n)))
            .collect::<Result<Vec<_>>>()?;
        let portfolio = engine.portfolio_var(&exposures, &returns_by_key, confidence)?;
        let standalone = engine.standalone_var_sum(&exposures, &returns_by_key, confidence)?;
        println!(
            "Portfolio VaR {:.2} ({:.2}% of capital), standalone sum {:.2}",
            portfolio.var_amount,
            portfolio.var_pct(engine.capital()) * 100.0,
            standalone
        );
        let d = engine.diversification(&exposures, &returns_by_key, confidence)?;
        println!(
            "Diversification ({:?}): portfolio {:.2} vs standalone {:.2}, benefit {:.2}",
            d.method,
            d.portfolio_var,
            d.standalone_sum,
            d.benefit()
        );
    }
    Ok(())
}

fn run_decide(
    config: DeskConfig,
    market: &MarketArgs,
    symbol: &str,
    signal: Option<SignalArg>,
    at: Option<&str>,
    records: Option<PathBuf>,
) -> Result<()> {
    let market = load_market(market)?;
    let Some(series) = market.get(symbol) else {
        bail!("no market data for '{symbol}'");
    };
    let now: DateTime<Utc> = match at {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("--at: '{text}' is not RFC 3339"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let mut desk = TradingDesk::new(config, StrategyRegistry::with_builtins())?;
    if let Some(path) = records {
        desk = desk.with_record_log(RecordLog::new(path));
    }

    let decision = match signal {
        None => {
            let one: BTreeMap<String, PriceSeries> =
                BTreeMap::from([(symbol.to_string(), series.clone())]);
            desk.evaluate_all(&one, now)
                .remove(symbol)
                .context("no decision produced")??
        }
        Some(direction) => {
            let ctx = PortfolioContext {
                positions: Vec::new(),
                returns_by_key: BTreeMap::from([(symbol.to_string(), series.close_returns())]),
            };
            desk.engine().evaluate(
                desk.book(),
                DecisionRequest {
                    symbol,
                    strategy_id: "manual",
                    direction: direction.into(),
                    confidence: 1.0,
                    bars: series.bars(),
                    now,
                },
                &ctx,
            )
        }
    };
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn run_recalibrate(
    config: DeskConfig,
    market: &MarketArgs,
    records: Option<PathBuf>,
) -> Result<()> {
    let market = load_market(market)?;
    let mut desk = TradingDesk::new(config, StrategyRegistry::with_builtins())?;
    if let Some(path) = records {
        desk = desk.with_record_log(RecordLog::new(path));
    }
    let now = market
        .values()
        .filter_map(|s| s.last().map(|b| b.timestamp))
        .max()
        .unwrap_or_else(Utc::now);
    for (symbol, weights) in desk.recalibrate(&market, now)? {
        println!("{symbol}:");
        for (id, w) in weights {
            println!("  {id:<20} {:>6.1}%", w * 100.0);
        }
    }
    Ok(())
}

fn run_demo(config: DeskConfig, symbols: &[String], bars: usize) -> Result<()> {
    let full: BTreeMap<String, PriceSeries> = symbols
        .iter()
        .map(|s| -> Result<(String, PriceSeries)> {
            Ok((s.clone(), synthetic_series(s, synthetic_start()?, bars)?))
        })
        .collect::<Result<_>>()?;
    let desk = TradingDesk::new(config, StrategyRegistry::with_builtins())?;

    // Walk the last 20 bars: recalibrate, evaluate, then watch the next bar.
    let steps = 20.min(bars.saturating_sub(1));
    let mut executed = 0;
    let mut closed = 0;
    for step in (1..=steps).rev() {
        let view: BTreeMap<String, PriceSeries> = full
            .iter()
            .map(|(s, series)| (s.clone(), series.head(bars - step)))
            .collect();
        let Some(now) = view.values().filter_map(|s| s.last()).map(|b| b.timestamp).max() else {
            continue;
        };
        desk.recalibrate(&view, now)?;
        for result in desk.evaluate_all(&view, now + Duration::hours(15)).into_values() {
            if matches!(result, Ok(ref d) if d.should_execute) {
                executed += 1;
            }
        }
        let next: BTreeMap<_, _> = full
            .iter()
            .filter_map(|(s, series)| {
                series.bars().get(bars - step).map(|b| (s.clone(), b.clone()))
            })
            .collect();
        closed += desk.watch_all(&next).len();
    }

    println!("Demo over {} symbols, {steps} steps", symbols.len());
    println!("  Executed decisions: {executed}");
    println!("  Positions closed:   {closed}");
    for symbol in symbols {
        let open = desk.book().open_positions(symbol);
        println!("  {symbol:<6} open positions: {}", open.len());
        for (id, w) in desk.weights(symbol)? {
            println!("    {id:<20} {:>6.1}%", w * 100.0);
        }
    }
    Ok(())
}
