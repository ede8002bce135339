// src/config.rs
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::indicator::IndicatorError;

/// Top-level daemon configuration, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "d_symbol")]               pub symbol: String,
    #[serde(default = "d_expo")]                 pub expo: i8,
    #[serde(default = "d_poll_secs")]            pub poll_secs: u64,
    #[serde(default = "d_history_days")]         pub history_days: usize,
    #[serde(default = "d_band_ratio")]           pub sanity_band_ratio: f64,
    #[serde(default = "d_true")]                 pub fallback_blend: bool,
    #[serde(default)]                            pub indicator: IndicatorConfig,
    #[serde(default)]                            pub clamp: ClampPolicy,
}
fn d_symbol() -> String { "BTC".into() }
fn d_expo() -> i8 { -2 }
fn d_poll_secs() -> u64 { 3600 }
fn d_history_days() -> usize { 1000 }
fn d_band_ratio() -> f64 { 2.0 }
fn d_true() -> bool { true }

#[inline]
pub fn secs(d: u64) -> Duration { Duration::from_secs(d) }

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            symbol: d_symbol(),
            expo: d_expo(),
            poll_secs: d_poll_secs(),
            history_days: d_history_days(),
            sanity_band_ratio: d_band_ratio(),
            fallback_blend: true,
            indicator: IndicatorConfig::default(),
            clamp: ClampPolicy::default(),
        }
    }
}

impl OracleConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.indicator.validate()?;
        cfg.clamp.check_length(&cfg.indicator)?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }
}

/// Desired indicator parameters, before clamping to the series length.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "d_length")]               pub length: usize,
    #[serde(default = "d_lambda")]               pub lambda: f64,
    #[serde(default = "d_weight_pow")]           pub time_weight_power: f64,
    #[serde(default = "d_weight_pow")]           pub vol_weight_power: f64,
    #[serde(default = "d_vol_length")]           pub vol_length: usize,
    #[serde(default = "d_input_smooth")]         pub input_smooth_length: usize,
    #[serde(default = "d_output_smooth")]        pub output_smooth_length: usize,
    #[serde(default = "d_k")]                    pub k: f64,
    #[serde(default = "d_stdev_length")]         pub stdev_length: usize,
    #[serde(default)]                            pub offset: f64,
}
fn d_length() -> usize { 300 }
fn d_lambda() -> f64 { 10.0 }
fn d_weight_pow() -> f64 { 1.2 }
fn d_vol_length() -> usize { 10 }
fn d_input_smooth() -> usize { 50 }
fn d_output_smooth() -> usize { 200 }
fn d_k() -> f64 { 0.05 }
fn d_stdev_length() -> usize { 200 }

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            length: d_length(),
            lambda: d_lambda(),
            time_weight_power: d_weight_pow(),
            vol_weight_power: d_weight_pow(),
            vol_length: d_vol_length(),
            input_smooth_length: d_input_smooth(),
            output_smooth_length: d_output_smooth(),
            k: d_k(),
            stdev_length: d_stdev_length(),
            offset: 0.0,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let windows = [
            ("length", self.length),
            ("vol_length", self.vol_length),
            ("input_smooth_length", self.input_smooth_length),
            ("output_smooth_length", self.output_smooth_length),
            ("stdev_length", self.stdev_length),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, w)| *w == 0) {
            return Err(IndicatorError::InvalidInput(format!("{name} must be at least 1")));
        }
        let scalars = [
            ("lambda", self.lambda),
            ("time_weight_power", self.time_weight_power),
            ("vol_weight_power", self.vol_weight_power),
            ("offset", self.offset),
        ];
        if let Some((name, v)) = scalars.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(IndicatorError::InvalidInput(format!("{name} must be finite and >= 0, got {v}")));
        }
        if !self.k.is_finite() || self.k <= 0.0 {
            return Err(IndicatorError::InvalidInput(format!("k must be > 0, got {}", self.k)));
        }
        Ok(())
    }
}

/// How desired windows shrink when the series is shorter than ideal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ClampPolicy {
    #[serde(default = "d_buffer")]               pub length_buffer: usize,
    #[serde(default = "d_min_length")]           pub min_length: usize,
    #[serde(default = "d_div_10")]               pub input_smooth_divisor: usize,
    #[serde(default = "d_div_5")]                pub output_smooth_divisor: usize,
    #[serde(default = "d_div_5")]                pub stdev_divisor: usize,
    #[serde(default = "d_div_5")]                pub vol_divisor: usize,
}
fn d_buffer() -> usize { 50 }
fn d_min_length() -> usize { 5 }
fn d_div_10() -> usize { 10 }
fn d_div_5() -> usize { 5 }

impl Default for ClampPolicy {
    fn default() -> Self {
        Self {
            length_buffer: d_buffer(),
            min_length: d_min_length(),
            input_smooth_divisor: d_div_10(),
            output_smooth_divisor: d_div_5(),
            stdev_divisor: d_div_5(),
            vol_divisor: d_div_5(),
        }
    }
}

impl ClampPolicy {
    /// Smallest regression window the clamp will accept.
    pub fn min_length(&self) -> usize {
        self.min_length.max(1)
    }

    /// A desired length the clamp could never reach is a configuration error,
    /// not a data shortage.
    pub fn check_length(&self, desired: &IndicatorConfig) -> Result<(), IndicatorError> {
        let min = self.min_length();
        if desired.length < min {
            return Err(IndicatorError::InvalidInput(format!(
                "length {} below minimum {min}",
                desired.length
            )));
        }
        Ok(())
    }
}

/// Parameters actually used for one run over a series of known length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveConfig {
    pub length: usize,
    pub lambda: f64,
    pub time_weight_power: f64,
    pub vol_weight_power: f64,
    pub vol_length: usize,
    pub input_smooth_length: usize,
    pub output_smooth_length: usize,
    pub k: f64,
    pub stdev_length: usize,
    pub offset: f64,
    /// true when any window was reduced below the desired value
    pub clamped: bool,
}

/// Clamp `desired` to what a series of `series_len` points supports.
///
/// The regression window keeps `length_buffer` points of headroom and must
/// stay at or above `min_length`; smoothing and threshold windows are capped
/// at `series_len / divisor` (never below 1).
pub fn derive_config(
    series_len: usize,
    desired: &IndicatorConfig,
    policy: &ClampPolicy,
) -> Result<EffectiveConfig, IndicatorError> {
    desired.validate()?;
    policy.check_length(desired)?;
    let min_length = policy.min_length();
    let need = policy.length_buffer + min_length;
    let length = desired.length.min(series_len.saturating_sub(policy.length_buffer));
    if series_len == 0 || length < min_length {
        return Err(IndicatorError::InsufficientData { have: series_len, need });
    }

    let cap = |want: usize, divisor: usize| want.min((series_len / divisor.max(1)).max(1));
    let eff = EffectiveConfig {
        length,
        lambda: desired.lambda,
        time_weight_power: desired.time_weight_power,
        vol_weight_power: desired.vol_weight_power,
        vol_length: cap(desired.vol_length, policy.vol_divisor),
        input_smooth_length: cap(desired.input_smooth_length, policy.input_smooth_divisor),
        output_smooth_length: cap(desired.output_smooth_length, policy.output_smooth_divisor),
        k: desired.k,
        stdev_length: cap(desired.stdev_length, policy.stdev_divisor),
        offset: desired.offset,
        clamped: false,
    };
    let clamped = eff.length != desired.length
        || eff.vol_length != desired.vol_length
        || eff.input_smooth_length != desired.input_smooth_length
        || eff.output_smooth_length != desired.output_smooth_length
        || eff.stdev_length != desired.stdev_length;
    Ok(EffectiveConfig { clamped, ..eff })
}
