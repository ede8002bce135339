// src/indicator/ma_blend.rs
use super::{IndexBuilder, IndicatorError};
use crate::types::{scale_by_expo, IndicatorResult, PricePoint};

/// Blend of spot and trailing moving averages, published when the full
/// indicator cannot produce a value.
///
/// * 100+ points: `0.5 * spot + 0.3 * ma30 + 0.2 * ma100`
/// * 30+ points: `0.7 * spot + 0.3 * ma30`
/// * otherwise: spot
pub struct MaBlendIndex {
    pub expo: i8,
}

impl MaBlendIndex {
    pub fn new(expo: i8) -> Self {
        Self { expo }
    }

    fn trailing_mean(prices: &[f64], n: usize) -> f64 {
        let tail = &prices[prices.len().saturating_sub(n)..];
        tail.iter().sum::<f64>() / tail.len() as f64
    }

    pub fn blend(prices: &[f64]) -> Option<f64> {
        let spot = *prices.last()?;
        let v = match prices.len() {
            n if n >= 100 => {
                0.5 * spot + 0.3 * Self::trailing_mean(prices, 30) + 0.2 * Self::trailing_mean(prices, 100)
            }
            n if n >= 30 => 0.7 * spot + 0.3 * Self::trailing_mean(prices, 30),
            _ => spot,
        };
        Some(v)
    }
}

impl IndexBuilder for MaBlendIndex {
    fn source(&self) -> &'static str {
        "ma-blend"
    }

    fn build(&self, series: &[PricePoint]) -> Result<IndicatorResult, IndicatorError> {
        let prices: Vec<f64> = series.iter().filter_map(PricePoint::usable_price).collect();
        let value = Self::blend(&prices).ok_or(IndicatorError::InsufficientData { have: 0, need: 1 })?;
        let scaled = scale_by_expo(value, self.expo)?;
        Ok(IndicatorResult { current_value: Some(value), scaled_integer: Some(scaled) })
    }
}
