//! Desk configuration — one TOML file, one section per component.
//!
//! ```toml
//! [simulation]
//! capital = 250000.0
//!
//! [decision]
//! min_reward_risk = 2.0
//! trading_windows = [{ start = "13:30:00", end = "20:00:00" }]
//! ```
//!
//! Missing sections and fields take their defaults. Every section is
//! validated on load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tradegate_core::engine::SimulationConfig;
use tradegate_core::range::RangeConfig;
use tradegate_core::risk::RiskConfig;

use crate::decision::DecisionConfig;
use crate::ensemble::EnsembleConfig;
use crate::error::RunnerResult;

/// Content hash of a configuration (BLAKE3 hex).
pub type ConfigFingerprint = String;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub simulation: SimulationConfig,
    pub risk: RiskConfig,
    pub range: RangeConfig,
    pub ensemble: EnsembleConfig,
    pub decision: DecisionConfig,
}

impl DeskConfig {
    pub fn from_toml(text: &str) -> RunnerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> RunnerResult<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> RunnerResult<()> {
        self.simulation.validate()?;
        self.risk.validate()?;
        self.range.validate()?;
        self.ensemble.validate()?;
        self.decision.validate()?;
        Ok(())
    }

    /// Deterministic hash of the canonical JSON form. Two configs with
    /// identical values share a fingerprint.
    pub fn fingerprint(&self) -> RunnerResult<ConfigFingerprint> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
