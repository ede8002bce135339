// src/metrics.rs
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_histogram_vec, IntCounterVec, HistogramVec};

pub static TICKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sbtc_oracle_ticks_total", "Oracle ticks by outcome", &["outcome"] // published|fallback|rejected|failed
    ).expect("register sbtc_oracle_ticks_total")
});

pub static FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sbtc_oracle_failures_total", "Indicator failures", &["reason"] // nodata|invalid|undefined|scaling
    ).expect("register sbtc_oracle_failures_total")
});

pub static COMPUTE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sbtc_oracle_compute_latency_seconds",
        "Indicator computation latency",
        &["source"], // sbtc|ma-blend
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).expect("register sbtc_oracle_compute_latency_seconds")
});
