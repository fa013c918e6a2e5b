//! Domain types for tradegate.

pub mod bar;
pub mod equity;
pub mod series;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use equity::{periodic_returns, EquityPoint};
pub use series::{PriceSeries, ReturnSeries};
pub use signal::{Direction, Side, Signal};
pub use trade::{Trade, TradeStatus};

/// Symbol type alias
pub type Symbol = String;
