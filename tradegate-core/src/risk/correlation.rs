//! Pairwise Pearson correlation over aligned return series.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::stats::pearson;
use super::RiskEngine;
use crate::domain::ReturnSeries;
use crate::error::{CoreError, CoreResult};

/// Square, symmetric correlation matrix keyed by instrument or strategy id.
///
/// Entries are in `[-1, 1]` or NaN when a pair has too little overlap or no
/// variance; every NaN entry has a matching line in `warnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub keys: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub warnings: Vec<String>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.keys.iter().position(|k| k == a)?;
        let j = self.keys.iter().position(|k| k == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Values of `a` and `b` at timestamps present in both.
pub(crate) fn overlap(a: &ReturnSeries, b: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .filter_map(|(ts, x)| b.get(ts).map(|y| (*x, *y)))
        .unzip()
}

impl RiskEngine {
    /// Correlation of every pair of series over their shared timestamps.
    pub fn correlation_matrix(
        &self,
        returns_by_key: &BTreeMap<String, ReturnSeries>,
    ) -> CoreResult<CorrelationMatrix> {
        if returns_by_key.is_empty() {
            return Err(CoreError::insufficient("correlation matrix", 1, 0));
        }
        let keys: Vec<String> = returns_by_key.keys().cloned().collect();
        let series: Vec<&ReturnSeries> = returns_by_key.values().collect();
        let n = keys.len();
        let mut values = vec![vec![f64::NAN; n]; n];
        let mut warnings = Vec::new();

        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let (xs, ys) = overlap(series[i], series[j]);
                let rho = if xs.len() < 2 {
                    warnings.push(format!(
                        "{} / {}: {} overlapping observations, need 2",
                        keys[i],
                        keys[j],
                        xs.len()
                    ));
                    f64::NAN
                } else {
                    match pearson(&xs, &ys) {
                        Some(r) => r,
                        None => {
                            warnings.push(format!(
                                "{} / {}: zero variance over {} observations",
                                keys[i],
                                keys[j],
                                xs.len()
                            ));
                            f64::NAN
                        }
                    }
                };
                values[i][j] = rho;
                values[j][i] = rho;
            }
        }

        for w in &warnings {
            tracing::warn!(warning = %w, "correlation entry undefined");
        }
        Ok(CorrelationMatrix {
            keys,
            values,
            warnings,
        })
    }
}
