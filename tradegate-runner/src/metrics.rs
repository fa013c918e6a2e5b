//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Only closed trades count toward trade statistics; synthetic end-of-data
//! exits can be excluded. With no qualifying trades every trade statistic is
//! zero rather than an error.

use serde::{Deserialize, Serialize};
use tradegate_core::domain::{periodic_returns, EquityPoint, Trade};

/// Bars per year for daily equity curves.
pub const DAILY_BARS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for one trade log and equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Largest peak-to-trough decline as a positive fraction.
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// `f64::INFINITY` when there are winners and no losers.
    #[serde(with = "infinite_f64")]
    pub profit_factor: f64,
    /// Mean PnL per trade in units of mean risk at entry.
    pub expectancy: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub trade_count: usize,
    pub max_consecutive_losses: usize,
    pub synthetic_exit_count: usize,
}

/// Derives [`Metrics`] from a simulation's trades and equity curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceEvaluator {
    bars_per_year: f64,
    include_synthetic: bool,
}

impl PerformanceEvaluator {
    pub fn new(bars_per_year: f64) -> Self {
        Self {
            bars_per_year,
            include_synthetic: true,
        }
    }

    /// Drop end-of-data synthetic exits from trade statistics.
    pub fn excluding_synthetic(mut self) -> Self {
        self.include_synthetic = false;
        self
    }

    pub fn evaluate(&self, trades: &[Trade], equity: &[EquityPoint]) -> Metrics {
        let counted: Vec<&Trade> = trades
            .iter()
            .filter(|t| !t.is_open() && (self.include_synthetic || !t.synthetic_exit))
            .collect();
        let curve: Vec<f64> = equity.iter().map(|p| p.equity).collect();
        let returns = periodic_returns(equity);
        let c = cagr(&curve, self.bars_per_year);
        let dd = max_drawdown(&curve);

        Metrics {
            total_return: total_return(&curve),
            cagr: c,
            sharpe: sharpe_ratio(&returns, self.bars_per_year),
            sortino: sortino_ratio(&returns, self.bars_per_year),
            calmar: if dd > 0.0 { c / dd } else { 0.0 },
            max_drawdown: dd,
            win_rate: win_rate(&counted),
            profit_factor: profit_factor(&counted),
            expectancy: expectancy(&counted),
            avg_win: avg_where(&counted, |p| p > 0.0),
            avg_loss: avg_where(&counted, |p| p < 0.0),
            trade_count: counted.len(),
            max_consecutive_losses: max_consecutive_losses(&counted),
            synthetic_exit_count: trades.iter().filter(|t| t.synthetic_exit).count(),
        }
    }
}

impl Default for PerformanceEvaluator {
    fn default() -> Self {
        Self::new(DAILY_BARS_PER_YEAR)
    }
}

/// `evaluate(trades, equity_points, bars_per_year)` with synthetic exits included.
pub fn evaluate(trades: &[Trade], equity: &[EquityPoint], bars_per_year: f64) -> Metrics {
    PerformanceEvaluator::new(bars_per_year).evaluate(trades, equity)
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound annual growth rate over `len - 1` periods.
///
/// Returns 0.0 for single-bar, constant, or non-positive equity.
pub fn cagr(equity_curve: &[f64], bars_per_year: f64) -> f64 {
    let (initial, last) = match (equity_curve.first(), equity_curve.last()) {
        (Some(&a), Some(&b)) if equity_curve.len() >= 2 => (a, b),
        _ => return 0.0,
    };
    if initial <= 0.0 || last <= 0.0 || bars_per_year <= 0.0 {
        return 0.0;
    }
    let years = (equity_curve.len() - 1) as f64 / bars_per_year;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio: mean / sample std * sqrt(bars_per_year).
///
/// Returns 0.0 when the standard deviation is zero or fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64], bars_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std * bars_per_year.sqrt()
}

/// Annualized Sortino ratio: mean / downside deviation * sqrt(bars_per_year).
///
/// Downside deviation is the root mean square of negative returns over all
/// periods. Returns 0.0 when there is no downside.
pub fn sortino_ratio(returns: &[f64], bars_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / downside_std * bars_per_year.sqrt()
}

/// Maximum drawdown as a positive fraction (0.15 = 15% below the peak).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd
}

/// Fraction of trades with positive PnL.
pub fn win_rate(trades: &[&Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profits / gross losses; infinite with no losers, 0 with no trades.
pub fn profit_factor(trades: &[&Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Mean PnL divided by mean risk at entry (stop distance times quantity).
pub fn expectancy(trades: &[&Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let n = trades.len() as f64;
    let mean_pnl = trades.iter().map(|t| t.pnl).sum::<f64>() / n;
    let mean_risk = trades.iter().map(|t| t.risk_amount()).sum::<f64>() / n;
    if mean_risk > 0.0 {
        mean_pnl / mean_risk
    } else {
        0.0
    }
}

/// Longest run of trades with PnL <= 0.
pub fn max_consecutive_losses(trades: &[&Trade]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() {
            current = 0;
        } else {
            current += 1;
            max_streak = max_streak.max(current);
        }
    }
    max_streak
}

fn avg_where(trades: &[&Trade], pred: impl Fn(f64) -> bool) -> f64 {
    let picked: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| pred(p)).collect();
    mean_f64(&picked)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// JSON has no infinity; write it as the string `"inf"`.
pub(crate) mod infinite_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            s.serialize_str("inf")
        } else {
            s.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(t) if t == "inf" => Ok(f64::INFINITY),
            Repr::Text(t) => Err(serde::de::Error::custom(format!(
                "expected a number or \"inf\", got {t:?}"
            ))),
        }
    }
}
