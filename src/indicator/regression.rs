// src/indicator/regression.rs
use crate::config::EffectiveConfig;

/// Added to |vol| before inverting it into a weight.
pub const VOL_EPSILON: f64 = 1e-10;
/// Stand-in volatility for samples whose volatility is undefined.
pub const MISSING_VOL: f64 = 0.01;

/// `L` consecutive (smoothed price, volatility) pairs ending at an
/// evaluation point. Index `k = 0` is the newest sample, `k = L - 1` the
/// oldest; the backing slices stay in chronological order.
#[derive(Debug, Clone, Copy)]
pub struct RegressionWindow<'a> {
    prices: &'a [Option<f64>],
    vols: &'a [Option<f64>],
}

impl<'a> RegressionWindow<'a> {
    /// Both slices must be chronological and of equal length.
    pub fn new(prices: &'a [Option<f64>], vols: &'a [Option<f64>]) -> Self {
        debug_assert_eq!(prices.len(), vols.len());
        Self { prices, vols }
    }

    /// The `len` samples ending at `end` (inclusive), if that many exist.
    pub fn ending_at(
        prices: &'a [Option<f64>],
        vols: &'a [Option<f64>],
        end: usize,
        len: usize,
    ) -> Option<Self> {
        if len == 0 || end >= prices.len() || end >= vols.len() || end + 1 < len {
            return None;
        }
        let start = end + 1 - len;
        Some(Self::new(&prices[start..=end], &vols[start..=end]))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// `(y_k, v_k)` with `k = 0` the newest sample.
    pub fn sample(&self, k: usize) -> (Option<f64>, Option<f64>) {
        let i = self.len() - 1 - k;
        (self.prices[i], self.vols[i])
    }
}

/// Fitted `ln y = intercept + slope * ln x`, i.e. `y = e^intercept * x^slope`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawFit {
    pub slope: f64,
    pub intercept: f64,
    pub total_weight: f64,
    pub samples: usize,
}

impl PowerLawFit {
    pub fn amplitude(&self) -> f64 {
        self.intercept.exp()
    }

    pub fn evaluate(&self, x: f64) -> Option<f64> {
        if !(x > 0.0) {
            return None;
        }
        let y = (self.intercept + self.slope * x.ln()).exp();
        y.is_finite().then_some(y)
    }
}

/// Weighted ridge regression of `ln y` on `ln x` over one window.
///
/// Each sample is weighted by `x^time_pow / (|vol| + eps)^vol_pow`, so
/// recent and calm samples dominate; `lambda` is added to the weighted
/// `ln x` variance before dividing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawRegressor {
    pub time_pow: f64,
    pub vol_pow: f64,
    pub lambda: f64,
    pub offset: f64,
}

impl PowerLawRegressor {
    pub fn new(time_pow: f64, vol_pow: f64, lambda: f64, offset: f64) -> Self {
        Self { time_pow, vol_pow, lambda, offset }
    }

    pub fn from_config(cfg: &EffectiveConfig) -> Self {
        Self::new(cfg.time_weight_power, cfg.vol_weight_power, cfg.lambda, cfg.offset)
    }

    #[inline]
    fn weight(&self, x: f64, vol: Option<f64>) -> f64 {
        let time_w = x.powf(self.time_pow);
        let v = vol.unwrap_or(MISSING_VOL);
        let vol_w = 1.0 / (v.abs() + VOL_EPSILON).powf(self.vol_pow);
        time_w * vol_w
    }

    /// `None` when no sample survives, when the total weight is zero, or
    /// when the regularized denominator is not positive.
    pub fn fit(&self, window: &RegressionWindow<'_>) -> Option<PowerLawFit> {
        let len = window.len();
        let mut sum_w = 0.0;
        let mut sum_w_logx = 0.0;
        let mut sum_w_logy = 0.0;
        let mut sum_w_logx_logy = 0.0;
        let mut sum_w_logx_logx = 0.0;
        let mut samples = 0usize;

        for k in 0..len {
            let x = (len - k) as f64;
            let (y, vol) = window.sample(k);
            let w = self.weight(x, vol);
            let y = match y {
                Some(y) if y.is_finite() && y > 0.0 => y,
                _ => continue,
            };
            if !w.is_finite() || x <= 0.0 {
                continue;
            }
            let log_x = x.ln();
            let log_y = y.ln();
            sum_w += w;
            sum_w_logx += w * log_x;
            sum_w_logy += w * log_y;
            sum_w_logx_logy += w * log_x * log_y;
            sum_w_logx_logx += w * log_x * log_x;
            samples += 1;
        }

        if sum_w == 0.0 {
            return None;
        }
        let xm = sum_w_logx / sum_w;
        let ym = sum_w_logy / sum_w;
        let num = sum_w_logx_logy - sum_w * xm * ym;
        let denom = sum_w_logx_logx - sum_w * xm * xm + self.lambda;
        if !(denom > 0.0) {
            return None;
        }
        let slope = num / denom;
        let intercept = ym - slope * xm;
        (slope.is_finite() && intercept.is_finite()).then_some(PowerLawFit {
            slope,
            intercept,
            total_weight: sum_w,
            samples,
        })
    }

    /// The fitted power law evaluated at `x = L - offset`.
    pub fn extrapolate(&self, window: &RegressionWindow<'_>) -> Option<f64> {
        self.fit(window)?.evaluate(window.len() as f64 - self.offset)
    }
}
