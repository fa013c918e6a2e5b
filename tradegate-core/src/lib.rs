//! Tradegate Core — domain types, trade simulator, risk engine, ranges, strategies.
//!
//! This crate contains the invariant-bearing parts of the decision platform:
//! - Domain types (bars, signals, trades, equity points, price series)
//! - Trade simulator replaying a signal stream over price history
//! - Risk engine: VaR, Expected Shortfall, correlation, portfolio limits,
//!   volatility-regime stops
//! - Volatility-scaled range calculator
//! - Uniform strategy capability and registry
//!
//! Everything here is a pure function of its inputs. Locking, persistence
//! and scheduling live in `tradegate-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod range;
pub mod risk;
pub mod strategy;

pub use error::{CoreError, CoreResult};
