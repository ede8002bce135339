// tests/scenarios.rs
use sbtc_oracle::config::{ClampPolicy, IndicatorConfig};
use sbtc_oracle::indicator::{IndicatorError, IndicatorPipeline, PowerLawRegressor, RegressionWindow};
use sbtc_oracle::types::{PricePoint, DAY_MS};

const START_MS: i64 = 1_600_000_000_000 - 1_600_000_000_000 % DAY_MS;

fn daily(prices: &[f64]) -> Vec<PricePoint> {
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| PricePoint::new(START_MS + i as i64 * DAY_MS, *p))
        .collect()
}

fn wavy(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            20_000.0 * (0.001 * t + 0.03 * (t / 7.0).sin() + 0.01 * (t / 3.0).cos()).exp()
        })
        .collect()
}

#[test]
fn linear_uptrend_stays_within_series_range() {
    let n = 400;
    let prices: Vec<f64> = (0..n).map(|i| 10_000.0 + 40_000.0 * i as f64 / (n - 1) as f64).collect();
    let cfg = IndicatorConfig { length: 300, ..IndicatorConfig::default() };
    let pipeline = IndicatorPipeline::new(cfg, ClampPolicy::default());

    let trace = pipeline.trace(&daily(&prices)).unwrap();
    assert_eq!(trace.effective.length, 300);
    let fit = trace.last_fit.expect("newest window fits");
    assert!(fit.slope > 0.0, "slope {}", fit.slope);

    let value = trace.current_value().expect("defined");
    let lo = 10_000.0;
    let hi = 50_000.0 * (1.0 + cfg.k);
    assert!(value >= lo && value <= hi, "value {value}");

    let result = pipeline.compute(&daily(&prices)).unwrap();
    assert_eq!(result.current_value, Some(value));
    let cents = result.scaled_integer.unwrap();
    assert!((cents as f64 / 100.0 - value).abs() <= 0.01);
}

#[test]
fn zero_price_entry_is_skipped_not_fatal() {
    let mut prices = wavy(400);
    prices[200] = 0.0;
    let series = daily(&prices);

    let r = IndicatorPipeline::default().compute(&series).unwrap();
    assert!(r.current_value.unwrap() > 0.0);

    // Without input smoothing the zero entry is visible as a hole in every
    // window that spans it.
    let cfg = IndicatorConfig { input_smooth_length: 1, ..IndicatorConfig::default() };
    let pipeline = IndicatorPipeline::new(cfg, ClampPolicy::default());
    let trace = pipeline.trace(&series).unwrap();
    assert_eq!(trace.smoothed_prices[200], None);
    assert_eq!(trace.log_returns[200], None);
    assert_eq!(trace.log_returns[201], None);
    assert!(trace.regression[299..].iter().all(Option::is_some));

    let regressor = PowerLawRegressor::from_config(&trace.effective);
    let window = RegressionWindow::ending_at(&trace.smoothed_prices, &trace.volatility, 399, 300).unwrap();
    assert_eq!(regressor.fit(&window).unwrap().samples, 299);
    assert!(trace.current_value().is_some());
}

#[test]
fn sixty_days_clamps_instead_of_failing() {
    let series = daily(&wavy(60));
    let pipeline = IndicatorPipeline::default();
    let trace = pipeline.trace(&series).unwrap();
    assert!(trace.effective.length <= 60 - ClampPolicy::default().length_buffer);
    assert!(trace.effective.length >= 5);
    assert!(trace.effective.clamped);

    let r = pipeline.compute(&series).unwrap();
    assert!(r.current_value.is_some());
    assert!(r.scaled_integer.is_some());
}

#[test]
fn too_short_even_after_clamping() {
    let series = daily(&wavy(30));
    assert!(matches!(
        IndicatorPipeline::default().compute(&series),
        Err(IndicatorError::InsufficientData { have: 30, .. })
    ));
}

#[test]
fn pipeline_is_deterministic() {
    let series = daily(&wavy(500));
    let a = IndicatorPipeline::default().trace(&series).unwrap();
    let b = IndicatorPipeline::default().trace(&series).unwrap();
    assert_eq!(a.dampened, b.dampened);
    assert_eq!(a.regression, b.regression);
}

#[test]
fn dampened_path_moves_within_threshold() {
    let series = daily(&wavy(500));
    let trace = IndicatorPipeline::default().trace(&series).unwrap();
    let k = trace.effective.k;
    for t in 1..series.len() {
        if let (Some(prev), Some(cur), Some(sd)) = (trace.dampened[t - 1], trace.dampened[t], trace.threshold_stdev[t]) {
            assert!((cur / prev).ln().abs() <= k * sd + 1e-12, "step {t}");
        }
    }
}
