//! CSV export of trades and equity curves.

use std::path::Path;

use tradegate_core::domain::{EquityPoint, Trade};

use crate::error::{RunnerError, RunnerResult};

fn finish(wtr: csv::Writer<Vec<u8>>) -> RunnerResult<String> {
    let data = wtr.into_inner().map_err(|e| RunnerError::Io(e.into_error()))?;
    String::from_utf8(data)
        .map_err(|_| RunnerError::InvalidData("CSV output is not valid UTF-8".into()))
}

/// Columns: symbol, strategy_id, side, entry_time, entry_price, exit_time,
/// exit_price, quantity, stop_distance, gross_pnl, commission, slippage,
/// pnl, pnl_pct, bars_held, synthetic_exit.
pub fn trades_csv(trades: &[Trade]) -> RunnerResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "strategy_id",
        "side",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "quantity",
        "stop_distance",
        "gross_pnl",
        "commission",
        "slippage",
        "pnl",
        "pnl_pct",
        "bars_held",
        "synthetic_exit",
    ])?;
    for t in trades {
        wtr.write_record([
            t.symbol.as_str(),
            t.strategy_id.as_str(),
            &format!("{:?}", t.side),
            &t.entry_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &t.exit_time.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
            &t.exit_price.map(|p| format!("{p:.6}")).unwrap_or_default(),
            &format!("{:.6}", t.quantity),
            &format!("{:.6}", t.stop_distance),
            &format!("{:.2}", t.gross_pnl),
            &format!("{:.2}", t.commission),
            &format!("{:.2}", t.slippage),
            &format!("{:.2}", t.pnl),
            &format!("{:.6}", t.pnl_pct),
            &t.bars_held.to_string(),
            &t.synthetic_exit.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn equity_csv(points: &[EquityPoint]) -> RunnerResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for p in points {
        wtr.write_record([p.timestamp.to_rfc3339(), format!("{:.2}", p.equity)])?;
    }
    finish(wtr)
}

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> RunnerResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, trades_csv(trades)?)?;
    Ok(())
}
