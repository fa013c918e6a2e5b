//! Hand-off from an external parameter search.
//!
//! The search itself is not run here; callers receive a ranked list of
//! parameter sets and install only the best one.

use serde::{Deserialize, Serialize};
use tradegate_core::strategy::StrategyParams;

/// One candidate from a parameter search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedParameters {
    pub parameters: StrategyParams,
    pub score: f64,
}

/// Highest-scoring candidate; ties go to the earliest. NaN scores never win.
pub fn top_ranked(candidates: &[RankedParameters]) -> Option<&RankedParameters> {
    candidates
        .iter()
        .filter(|c| !c.score.is_nan())
        .fold(None, |best: Option<&RankedParameters>, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })
}
