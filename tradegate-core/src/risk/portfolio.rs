//! Portfolio VaR and the pre-trade risk-limit check.
//!
//! Positions are combined into one portfolio-return series,
//! `r_p(t) = sum(notional_i * r_i(t)) / capital`, over the timestamps every
//! held key has in common; historical VaR is then taken on `r_p`.
//!
//! Historical VaR is not subadditive: a sample whose tail losses land on
//! different dates for each position can give a portfolio VaR above the
//! standalone sum. [`RiskEngine::diversification`] detects that and reports
//! both figures from parametric VaR instead, which is subadditive.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RiskEngine, RiskReading, VarMethod};
use crate::domain::ReturnSeries;
use crate::error::{CoreError, CoreResult};

/// Signed notional held in one instrument or strategy (short < 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub key: String,
    pub notional: f64,
}

impl Exposure {
    pub fn new(key: impl Into<String>, notional: f64) -> Self {
        Self {
            key: key.into(),
            notional,
        }
    }
}

/// Outcome of a pre-trade limit check. A breach is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimitCheck {
    pub within_limits: bool,
    pub var_pct: f64,
    pub limit_pct: f64,
    pub reason: Option<String>,
}

/// Portfolio VaR next to the sum of standalone VaRs, both from `method`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diversification {
    pub method: VarMethod,
    pub portfolio_var: f64,
    pub standalone_sum: f64,
}

impl Diversification {
    /// VaR saved by holding the positions together.
    pub fn benefit(&self) -> f64 {
        self.standalone_sum - self.portfolio_var
    }
}

fn net_exposures(positions: &[Exposure]) -> BTreeMap<&str, f64> {
    let mut net = BTreeMap::new();
    for p in positions {
        *net.entry(p.key.as_str()).or_insert(0.0) += p.notional;
    }
    net
}

/// Timestamps shared by the series of every key in `net`.
fn common_timestamps<'a>(
    net: &BTreeMap<&str, f64>,
    returns_by_key: &'a BTreeMap<String, ReturnSeries>,
) -> CoreResult<(Vec<&'a ReturnSeries>, Vec<DateTime<Utc>>)> {
    let mut series = Vec::with_capacity(net.len());
    for key in net.keys() {
        let s = returns_by_key.get(*key).ok_or_else(|| {
            CoreError::Alignment(format!("no return series for position '{key}'"))
        })?;
        series.push(s);
    }
    let mut common: BTreeSet<DateTime<Utc>> = match series.first() {
        Some(first) => first.keys().copied().collect(),
        None => BTreeSet::new(),
    };
    for s in series.iter().skip(1) {
        common.retain(|ts| s.contains_key(ts));
    }
    Ok((series, common.into_iter().collect()))
}

impl RiskEngine {
    /// Portfolio-return series for `positions` as fractions of capital.
    pub fn portfolio_returns(
        &self,
        positions: &[Exposure],
        returns_by_key: &BTreeMap<String, ReturnSeries>,
    ) -> CoreResult<Vec<f64>> {
        let net = net_exposures(positions);
        if net.is_empty() {
            return Err(CoreError::insufficient("portfolio positions", 1, 0));
        }
        let (series, timestamps) = common_timestamps(&net, returns_by_key)?;
        let weights: Vec<f64> = net.values().map(|n| n / self.capital).collect();
        Ok(timestamps
            .iter()
            .map(|ts| {
                series
                    .iter()
                    .zip(&weights)
                    .map(|(s, w)| w * s[ts])
                    .sum()
            })
            .collect())
    }

    pub fn portfolio_var(
        &self,
        positions: &[Exposure],
        returns_by_key: &BTreeMap<String, ReturnSeries>,
        confidence: f64,
    ) -> CoreResult<RiskReading> {
        let returns = self.portfolio_returns(positions, returns_by_key)?;
        self.var_historical(&returns, confidence)
    }

    /// Sum of each net position's own historical VaR, over the same
    /// timestamps `portfolio_var` uses.
    pub fn standalone_var_sum(
        &self,
        positions: &[Exposure],
        returns_by_key: &BTreeMap<String, ReturnSeries>,
        confidence: f64,
    ) -> CoreResult<f64> {
        self.standalone_sum_with(positions, returns_by_key, |r| {
            self.var_historical(r, confidence)
        })
    }

    fn standalone_sum_with(
        &self,
        positions: &[Exposure],
        returns_by_key: &BTreeMap<String, ReturnSeries>,
        var: impl Fn(&[f64]) -> CoreResult<RiskReading>,
    ) -> CoreResult<f64> {
        let net = net_exposures(positions);
        if net.is_empty() {
            return Err(CoreError::insufficient("portfolio positions", 1, 0));
        }
        let (series, timestamps) = common_timestamps(&net, returns_by_key)?;
        let mut total = 0.0;
        for (s, notional) in series.iter().zip(net.values()) {
            let w = notional / self.capital;
            let scaled: Vec<f64> = timestamps.iter().map(|ts| w * s[ts]).collect();
            total += var(&scaled)?.var_amount;
        }
        Ok(total)
    }

    /// Portfolio VaR against the standalone sum. Historical when the sample
    /// shows a benefit; otherwise both figures are parametric, so the
    /// portfolio figure is below the sum whenever the positions are not
    /// perfectly correlated and the sum is positive.
    pub fn diversification(
        &self,
        positions: &[Exposure],
        returns_by_key: &BTreeMap<String, ReturnSeries>,
        confidence: f64,
    ) -> CoreResult<Diversification> {
        let portfolio = self.portfolio_var(positions, returns_by_key, confidence)?.var_amount;
        let standalone = self.standalone_var_sum(positions, returns_by_key, confidence)?;
        if portfolio < standalone {
            return Ok(Diversification {
                method: VarMethod::Historical,
                portfolio_var: portfolio,
                standalone_sum: standalone,
            });
        }
        let returns = self.portfolio_returns(positions, returns_by_key)?;
        let portfolio = self.var_parametric(&returns, confidence)?.var_amount;
        let standalone = self.standalone_sum_with(positions, returns_by_key, |r| {
            self.var_parametric(r, confidence)
        })?;
        Ok(Diversification {
            method: VarMethod::Parametric,
            portfolio_var: portfolio,
            standalone_sum: standalone,
        })
    }

    /// Portfolio VaR with `proposed` added, against `max_portfolio_var_pct`
    /// of `capital`.
    pub fn check_portfolio_risk_limits(
        &self,
        positions: &[Exposure],
        returns_by_key: &BTreeMap<String, ReturnSeries>,
        proposed: &Exposure,
        max_portfolio_var_pct: f64,
        capital: f64,
    ) -> CoreResult<RiskLimitCheck> {
        if !(max_portfolio_var_pct > 0.0) {
            return Err(CoreError::config(format!(
                "max_portfolio_var_pct must be > 0, got {max_portfolio_var_pct}"
            )));
        }
        let engine = self.with_capital(capital)?;
        let mut combined = positions.to_vec();
        combined.push(proposed.clone());
        let reading =
            engine.portfolio_var(&combined, returns_by_key, self.config.confidence)?;
        let var_pct = reading.var_pct(capital);

        let within_limits = var_pct <= max_portfolio_var_pct + 1e-12;
        let reason = (!within_limits).then(|| {
            format!(
                "portfolio VaR {:.2}% of capital exceeds limit {:.2}%",
                var_pct * 100.0,
                max_portfolio_var_pct * 100.0
            )
        });
        Ok(RiskLimitCheck {
            within_limits,
            var_pct,
            limit_pct: max_portfolio_var_pct,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskConfig;
    use chrono::{Duration, TimeZone};

    fn series(values: &[f64]) -> ReturnSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    fn wave(n: usize, phase: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (((i + phase) * 7 % 13) as f64 - 6.0) / 200.0)
            .collect()
    }

    fn engine() -> RiskEngine {
        RiskEngine::new(100_000.0, RiskConfig::default()).unwrap()
    }

    #[test]
    fn offsetting_positions_diversify() {
        let a = wave(40, 0);
        let b: Vec<f64> = a.iter().map(|r| -r).collect();
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), series(&a));
        input.insert("B".to_string(), series(&b));
        let positions = [Exposure::new("A", 50_000.0), Exposure::new("B", 50_000.0)];

        let e = engine();
        let pv = e.portfolio_var(&positions, &input, 0.95).unwrap().var_amount;
        let sum = e.standalone_var_sum(&positions, &input, 0.95).unwrap();
        assert!(pv < sum);
    }

    #[test]
    fn perfectly_correlated_positions_add_up() {
        let a = wave(40, 3);
        let b: Vec<f64> = a.iter().map(|r| 2.0 * r).collect();
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), series(&a));
        input.insert("B".to_string(), series(&b));
        let positions = [Exposure::new("A", 30_000.0), Exposure::new("B", 20_000.0)];

        let e = engine();
        let pv = e.portfolio_var(&positions, &input, 0.95).unwrap().var_amount;
        let sum = e.standalone_var_sum(&positions, &input, 0.95).unwrap();
        assert!((pv - sum).abs() < 1e-6);
    }

    #[test]
    fn split_tail_losses_fall_back_to_parametric() {
        // Each series loses once, on different days; alone neither loss
        // reaches the 95% quantile, together both do.
        let mut a = vec![0.01; 30];
        let mut b = vec![0.01; 30];
        a[3] = -0.10;
        b[11] = -0.10;
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), series(&a));
        input.insert("B".to_string(), series(&b));
        let positions = [Exposure::new("A", 50_000.0), Exposure::new("B", 50_000.0)];

        let e = engine();
        let historical = e.portfolio_var(&positions, &input, 0.95).unwrap().var_amount;
        assert!((historical - 4_500.0).abs() < 1e-6);
        assert_eq!(e.standalone_var_sum(&positions, &input, 0.95).unwrap(), 0.0);

        let d = e.diversification(&positions, &input, 0.95).unwrap();
        assert_eq!(d.method, VarMethod::Parametric);
        assert!(d.portfolio_var < d.standalone_sum);
        assert!(d.benefit() > 0.0);
    }

    #[test]
    fn diversification_keeps_historical_when_it_shows_a_benefit() {
        let a = wave(40, 0);
        let b: Vec<f64> = a.iter().map(|r| -r).collect();
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), series(&a));
        input.insert("B".to_string(), series(&b));
        let positions = [Exposure::new("A", 50_000.0), Exposure::new("B", 50_000.0)];
        let d = engine().diversification(&positions, &input, 0.95).unwrap();
        assert_eq!(d.method, VarMethod::Historical);
        assert!(d.portfolio_var < d.standalone_sum);
    }

    #[test]
    fn same_key_positions_are_netted() {
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), series(&[-0.01; 30]));
        let positions = [Exposure::new("A", 60_000.0), Exposure::new("A", 40_000.0)];
        let pv = engine().portfolio_var(&positions, &input, 0.95).unwrap();
        assert!((pv.var_amount - 1_000.0).abs() < 1e-6);
    }

    #[test]
    fn missing_series_is_alignment_error() {
        let input = BTreeMap::new();
        let err = engine()
            .portfolio_var(&[Exposure::new("A", 1.0)], &input, 0.95)
            .unwrap_err();
        assert!(matches!(err, CoreError::Alignment(_)));
    }

    #[test]
    fn breach_reports_both_percentages() {
        let mut returns = vec![0.01; 30];
        returns[4] = -0.05;
        returns[17] = -0.021;
        let mut input = BTreeMap::new();
        input.insert("SPY".to_string(), series(&returns));

        let check = engine()
            .check_portfolio_risk_limits(
                &[],
                &input,
                &Exposure::new("SPY", 100_000.0),
                0.02,
                100_000.0,
            )
            .unwrap();
        assert!(!check.within_limits);
        assert!((check.var_pct - 0.021).abs() < 1e-12);
        let reason = check.reason.unwrap();
        assert!(reason.contains("2.10%"));
        assert!(reason.contains("2.00%"));
    }

    #[test]
    fn small_proposal_within_limits() {
        let mut input = BTreeMap::new();
        input.insert("SPY".to_string(), series(&wave(40, 1)));
        let check = engine()
            .check_portfolio_risk_limits(
                &[],
                &input,
                &Exposure::new("SPY", 10_000.0),
                0.02,
                100_000.0,
            )
            .unwrap();
        assert!(check.within_limits);
        assert!(check.reason.is_none());
    }
}
