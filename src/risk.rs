// src/risk.rs
use crate::indicator::IndicatorError;

/// Acceptance rule applied before publishing: the target must sit strictly
/// inside `(spot / ratio, spot * ratio)`, the same band the on-chain record
/// enforces on updates.
pub struct RiskEngine {
    pub band_ratio: f64,
}

impl RiskEngine {
    pub fn new(band_ratio: f64) -> Self {
        Self { band_ratio: band_ratio.max(1.0) }
    }

    /// Both values in the same fixed-point units.
    pub fn within_band(&self, target_scaled: u64, spot_scaled: u64) -> bool {
        let (t, s) = (target_scaled as f64, spot_scaled as f64);
        t > s / self.band_ratio && t < s * self.band_ratio
    }

    /// Map indicator errors to short reason codes for logs and metrics.
    pub fn map_index_error(&self, e: &IndicatorError) -> &'static str {
        match e {
            IndicatorError::InsufficientData { .. } => "nodata",
            IndicatorError::InvalidInput(_)         => "invalid",
            IndicatorError::ComputationUndefined    => "undefined",
            IndicatorError::Scaling(_)              => "scaling",
        }
    }
}
