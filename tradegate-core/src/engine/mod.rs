//! Simulation engine — replays signals over bars into trades and an equity
//! curve, with percentage costs and stop-distance position sizing.

pub mod costs;
pub mod simulator;
pub mod stops;

pub use costs::CostModel;
pub use simulator::{SimulationConfig, SimulationResult, TradeSimulator};
pub use stops::StopModel;
