// src/indicator/pipeline.rs
use rayon::prelude::*;

use super::dampening::DampeningFilter;
use super::regression::{PowerLawFit, PowerLawRegressor, RegressionWindow};
use super::smoothing::RollingMean;
use super::volatility::{log_returns, VolatilityEstimator};
use super::{IndexBuilder, IndicatorError, Series};
use crate::config::{derive_config, ClampPolicy, EffectiveConfig, IndicatorConfig};
use crate::types::{scale_by_expo, IndicatorResult, PricePoint};

/// Every intermediate series of one run, aligned with the input series.
#[derive(Debug, Clone)]
pub struct IndicatorTrace {
    pub effective: EffectiveConfig,
    pub log_returns: Series,
    pub volatility: Series,
    pub smoothed_prices: Series,
    pub regression: Series,
    pub smoothed_regression: Series,
    pub threshold_stdev: Series,
    pub dampened: Series,
    /// Fit of the window ending at the newest sample.
    pub last_fit: Option<PowerLawFit>,
}

impl IndicatorTrace {
    pub fn current_value(&self) -> Option<f64> {
        self.dampened.last().copied().flatten()
    }
}

/// The SBTC indicator: volatility-weighted ridge power-law regression over
/// rolling windows, smoothed on both sides and dampened in log space.
#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    pub desired: IndicatorConfig,
    pub policy: ClampPolicy,
    pub expo: i8,
}

impl Default for IndicatorPipeline {
    fn default() -> Self {
        Self::new(IndicatorConfig::default(), ClampPolicy::default())
    }
}

impl IndicatorPipeline {
    pub fn new(desired: IndicatorConfig, policy: ClampPolicy) -> Self {
        Self { desired, policy, expo: -2 }
    }

    pub fn with_expo(mut self, expo: i8) -> Self {
        self.expo = expo;
        self
    }

    fn check_order(series: &[PricePoint]) -> Result<(), IndicatorError> {
        match series.windows(2).position(|w| w[1].ts_ms <= w[0].ts_ms) {
            Some(i) => Err(IndicatorError::InvalidInput(format!(
                "timestamps must be strictly increasing (index {})",
                i + 1
            ))),
            None => Ok(()),
        }
    }

    /// Run every stage and keep the intermediate series.
    pub fn trace(&self, series: &[PricePoint]) -> Result<IndicatorTrace, IndicatorError> {
        Self::check_order(series)?;
        let eff = derive_config(series.len(), &self.desired, &self.policy)?;
        if eff.clamped {
            tracing::warn!(
                n = series.len(),
                length = eff.length,
                input_smooth = eff.input_smooth_length,
                output_smooth = eff.output_smooth_length,
                stdev_length = eff.stdev_length,
                "series shorter than desired; windows clamped"
            );
        } else {
            tracing::debug!(n = series.len(), length = eff.length, "indicator config");
        }

        let prices: Series = series.iter().map(PricePoint::usable_price).collect();
        let returns = log_returns(&prices);
        let volatility = VolatilityEstimator::new(eff.vol_length).estimate_returns(&returns);
        let smoothed_prices = RollingMean::new(eff.input_smooth_length).smooth(&prices);

        let regressor = PowerLawRegressor::from_config(&eff);
        let fits: Vec<Option<PowerLawFit>> = (0..series.len())
            .into_par_iter()
            .map(|t| {
                RegressionWindow::ending_at(&smoothed_prices, &volatility, t, eff.length)
                    .and_then(|w| regressor.fit(&w))
            })
            .collect();
        let eval_x = eff.length as f64 - eff.offset;
        let regression: Series =
            fits.iter().map(|f| f.and_then(|f| f.evaluate(eval_x))).collect();
        let last_fit = fits.last().copied().flatten();

        let smoothed_regression = RollingMean::new(eff.output_smooth_length).smooth(&regression);
        let threshold_stdev = VolatilityEstimator::new(eff.stdev_length).estimate_returns(&returns);
        let dampened = DampeningFilter::run(eff.k, &smoothed_regression, &threshold_stdev);

        let undefined = regression.iter().filter(|v| v.is_none()).count();
        tracing::debug!(
            windows = series.len() + 1 - eff.length,
            undefined_regressions = undefined,
            slope = last_fit.map(|f| f.slope),
            "indicator stages done"
        );

        Ok(IndicatorTrace {
            effective: eff,
            log_returns: returns,
            volatility,
            smoothed_prices,
            regression,
            smoothed_regression,
            threshold_stdev,
            dampened,
            last_fit,
        })
    }

    /// Current value and encoding; either may be undefined.
    pub fn evaluate(&self, series: &[PricePoint]) -> Result<IndicatorResult, IndicatorError> {
        let trace = self.trace(series)?;
        Ok(IndicatorResult::from_value(trace.current_value(), self.expo))
    }

    /// Like [`evaluate`](Self::evaluate) but an undefined or unencodable
    /// value is an error.
    pub fn compute(&self, series: &[PricePoint]) -> Result<IndicatorResult, IndicatorError> {
        let value = self
            .evaluate(series)?
            .current_value
            .ok_or(IndicatorError::ComputationUndefined)?;
        let scaled = scale_by_expo(value, self.expo)?;
        Ok(IndicatorResult { current_value: Some(value), scaled_integer: Some(scaled) })
    }
}

impl IndexBuilder for IndicatorPipeline {
    fn source(&self) -> &'static str {
        "sbtc"
    }

    fn build(&self, series: &[PricePoint]) -> Result<IndicatorResult, IndicatorError> {
        self.compute(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DAY_MS;

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint::new(i as i64 * DAY_MS, *p))
            .collect()
    }

    fn small_pipeline() -> IndicatorPipeline {
        let cfg = IndicatorConfig {
            length: 20,
            input_smooth_length: 5,
            output_smooth_length: 5,
            stdev_length: 10,
            vol_length: 5,
            ..IndicatorConfig::default()
        };
        IndicatorPipeline::new(cfg, ClampPolicy { length_buffer: 0, ..ClampPolicy::default() })
    }

    #[test]
    fn regression_defined_only_with_full_window() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 * (1.0 + 0.01 * i as f64)).collect();
        let trace = small_pipeline().trace(&series(&prices)).unwrap();
        assert_eq!(trace.regression.len(), 60);
        assert!(trace.regression[..19].iter().all(Option::is_none));
        assert!(trace.regression[19..].iter().all(Option::is_some));
        assert!(trace.dampened[..19].iter().all(Option::is_none));
        assert!(trace.current_value().is_some());
    }

    #[test]
    fn constant_series_yields_that_constant() {
        let trace = small_pipeline().trace(&series(&[250.0; 80])).unwrap();
        for v in trace.regression[19..].iter() {
            assert!((v.unwrap() - 250.0).abs() < 1e-6);
        }
        let result = small_pipeline().compute(&series(&[250.0; 80])).unwrap();
        assert!((result.current_value.unwrap() - 250.0).abs() < 1e-6);
        assert_eq!(result.scaled_integer, Some(25_000));
    }

    #[test]
    fn unordered_timestamps_are_rejected() {
        let mut s = series(&[1.0; 70]);
        s[10].ts_ms = s[9].ts_ms;
        assert!(matches!(small_pipeline().trace(&s), Err(IndicatorError::InvalidInput(_))));
    }

    #[test]
    fn empty_series_is_insufficient() {
        assert!(matches!(
            IndicatorPipeline::default().compute(&[]),
            Err(IndicatorError::InsufficientData { have: 0, .. })
        ));
    }

    #[test]
    fn all_invalid_prices_are_undefined_not_fatal() {
        let s = series(&[0.0; 70]);
        let r = small_pipeline().evaluate(&s).unwrap();
        assert_eq!(r, IndicatorResult::undefined());
        assert_eq!(small_pipeline().compute(&s), Err(IndicatorError::ComputationUndefined));
    }

    #[test]
    fn last_fit_matches_newest_regression() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 * (1.0 + 0.01 * i as f64)).collect();
        let s = series(&prices);
        let trace = small_pipeline().trace(&s).unwrap();
        let fit = trace.last_fit.expect("newest window fits");
        let x = trace.effective.length as f64 - trace.effective.offset;
        assert_eq!(fit.evaluate(x), *trace.regression.last().unwrap());

        let regressor = PowerLawRegressor::from_config(&trace.effective);
        let window = RegressionWindow::ending_at(&trace.smoothed_prices, &trace.volatility, 59, 20).unwrap();
        assert_eq!(regressor.fit(&window), Some(fit));
    }

    #[test]
    fn builder_reports_source() {
        let p = IndicatorPipeline::default();
        assert_eq!(IndexBuilder::source(&p), "sbtc");
    }
}
