// src/indicator/volatility.rs
use super::smoothing::rolling_apply;
use super::Series;

/// `ln(p_t) - ln(p_{t-1})`; undefined at index 0 and wherever either price
/// is undefined, non-positive or non-finite.
pub fn log_returns(prices: &[Option<f64>]) -> Series {
    let logs: Vec<Option<f64>> = prices
        .iter()
        .map(|p| p.filter(|v| v.is_finite() && *v > 0.0).map(f64::ln))
        .collect();
    let mut out = Vec::with_capacity(logs.len());
    if !logs.is_empty() {
        out.push(None);
    }
    out.extend(logs.windows(2).map(|w| match (w[0], w[1]) {
        (Some(prev), Some(cur)) => Some(cur - prev),
        _ => None,
    }));
    out
}

/// Population standard deviation (ddof = 0).
pub fn population_std(xs: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    var.sqrt()
}

/// Trailing population std over `window` points, undefined samples skipped.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Series {
    rolling_apply(values, window, |xs| Some(population_std(xs)))
}

/// Rolling standard deviation of log returns.
#[derive(Debug, Clone, Copy)]
pub struct VolatilityEstimator {
    pub window: usize,
}

impl VolatilityEstimator {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1) }
    }

    pub fn estimate(&self, prices: &[Option<f64>]) -> Series {
        self.estimate_returns(&log_returns(prices))
    }

    /// Same estimator over precomputed log returns.
    pub fn estimate_returns(&self, returns: &[Option<f64>]) -> Series {
        rolling_std(returns, self.window)
    }
}
