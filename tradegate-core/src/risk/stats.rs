//! Descriptive statistics shared by the risk functions.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{CoreError, CoreResult};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Zero for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Pearson correlation of two equal-length samples.
///
/// `None` when fewer than two pairs or either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx < 1e-30 || vy < 1e-30 {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

/// Inverse standard-normal CDF at `p`.
pub fn normal_quantile(p: f64) -> CoreResult<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| CoreError::config(format!("standard normal: {e}")))?;
    Ok(normal.inverse_cdf(p))
}

/// Index of the lower-tail quantile: `floor((1 - confidence) * n)`, capped at
/// `n - 1`. A tiny epsilon keeps exact products (0.05 * 30) from flooring low.
pub fn tail_index(confidence: f64, n: usize) -> usize {
    let raw = ((1.0 - confidence) * n as f64 + 1e-9).floor() as usize;
    raw.min(n.saturating_sub(1))
}
