// src/types.rs
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::indicator::IndicatorError;

/// One daily observation. Series are kept oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts_ms: i64, // unix ms
    pub price: f64,
}

impl PricePoint {
    pub fn new(ts_ms: i64, price: f64) -> Self {
        Self { ts_ms, price }
    }

    /// The price when it can enter a log-domain computation.
    #[inline]
    pub fn usable_price(&self) -> Option<f64> {
        (self.price.is_finite() && self.price > 0.0).then_some(self.price)
    }
}

pub const DAY_MS: i64 = 86_400_000;

/// Output of one indicator run. Either field may be undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub current_value: Option<f64>,
    pub scaled_integer: Option<u64>,
}

impl IndicatorResult {
    pub fn undefined() -> Self {
        Self { current_value: None, scaled_integer: None }
    }

    /// Attach the fixed-point encoding when the value allows one.
    pub fn from_value(value: Option<f64>, expo: i8) -> Self {
        let scaled_integer = value.and_then(|v| scale_by_expo(v, expo).ok());
        Self { current_value: value, scaled_integer }
    }
}

/// Record handed to a publisher after a successful tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleReport {
    pub symbol: String,
    pub spot_price: f64,
    pub target_price: f64,
    pub target_scaled: u64,
    pub expo: i8,
    pub data_points_used: usize,
    pub computed_at_ms: i64,
    pub data_source: String,
    pub indicator_source: String, // "sbtc" | "ma-blend"
    pub series_digest: String,
}

/// Fixed-point encoding: `round(px * 10^-expo)`. `expo = -2` gives cents.
#[inline]
pub fn scale_by_expo(px: f64, expo: i8) -> Result<u64, IndicatorError> {
    if !px.is_finite() || px < 0.0 {
        return Err(IndicatorError::Scaling("invalid price"));
    }
    if !(-10..=0).contains(&expo) {
        return Err(IndicatorError::Scaling("unsupported expo"));
    }
    let scaled = (px * 10f64.powi(-(expo as i32))).round();
    if scaled >= u64::MAX as f64 {
        return Err(IndicatorError::Scaling("out of range"));
    }
    Ok(scaled as u64)
}

/// Newest usable price of a chronological series.
pub fn spot_price(series: &[PricePoint]) -> Option<f64> {
    series.iter().rev().find_map(PricePoint::usable_price)
}

/// SHA-256 over `(ts_ms, price bits)` of every point, hex encoded.
pub fn series_digest(series: &[PricePoint]) -> String {
    let mut hasher = Sha256::new();
    for p in series {
        hasher.update(p.ts_ms.to_le_bytes());
        hasher.update(p.price.to_bits().to_le_bytes());
    }
    hex::encode(hasher.finalize())
}
