// src/indicator/mod.rs
use crate::types::{IndicatorResult, PricePoint};

pub mod dampening;
pub mod ma_blend;
pub mod pipeline;
pub mod regression;
pub mod smoothing;
pub mod volatility;

pub use dampening::DampeningFilter;
pub use ma_blend::MaBlendIndex;
pub use pipeline::{IndicatorPipeline, IndicatorTrace};
pub use regression::{PowerLawFit, PowerLawRegressor, RegressionWindow};
pub use smoothing::{InputSmoother, OutputSmoother, RollingMean};
pub use volatility::VolatilityEstimator;

/// A value per position of a series; `None` marks an undefined sample.
pub type Series = Vec<Option<f64>>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("insufficient data: have {have} points, need at least {need}")]
    InsufficientData { have: usize, need: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("indicator value is undefined")]
    ComputationUndefined,
    #[error("scaling: {0}")]
    Scaling(&'static str),
}

/// Anything that turns a chronological price series into an indicator value.
pub trait IndexBuilder: Send + Sync {
    /// Short label recorded in published reports.
    fn source(&self) -> &'static str;
    fn build(&self, series: &[PricePoint]) -> Result<IndicatorResult, IndicatorError>;
}
