//! Equity curve points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account equity at a bar timestamp.
///
/// Produced only by the simulator; reflects realized PnL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Periodic simple returns between consecutive equity points.
///
/// Non-positive prior equity yields a 0.0 return for that period.
pub fn periodic_returns(points: &[EquityPoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| {
            if w[0].equity > 0.0 {
                (w[1].equity - w[0].equity) / w[0].equity
            } else {
                0.0
            }
        })
        .collect()
}
