//! Transaction costs: percentage slippage and commission.
//!
//! Slippage always works against the trader: buys fill above the reference
//! price, sells below it.

use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Percentage cost model applied to every fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Commission as a fraction of traded notional (0.001 = 0.1%).
    pub commission_pct: f64,
    /// Slippage as a fraction of the reference price.
    pub slippage_pct: f64,
}

impl CostModel {
    pub fn frictionless() -> Self {
        Self {
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }

    /// Fill price for opening a trade on `side` at reference `price`.
    pub fn entry_price(&self, side: Side, price: f64) -> f64 {
        match side {
            Side::Long => price * (1.0 + self.slippage_pct),
            Side::Short => price * (1.0 - self.slippage_pct),
        }
    }

    /// Fill price for closing a trade on `side` at reference `price`.
    pub fn exit_price(&self, side: Side, price: f64) -> f64 {
        match side {
            Side::Long => price * (1.0 - self.slippage_pct),
            Side::Short => price * (1.0 + self.slippage_pct),
        }
    }

    /// Currency cost of slippage for a fill of `quantity` at reference `price`.
    pub fn slippage_cost(&self, price: f64, quantity: f64) -> f64 {
        price * self.slippage_pct * quantity
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            commission_pct: 0.001,
            slippage_pct: 0.0005,
        }
    }
}
