// src/providers/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::types::PricePoint;

/// Daily history together with the label of the provider that served it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedHistory {
    pub source: String,
    pub points: Vec<PricePoint>,
}

#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `days` daily points, oldest first, one per UTC day.
    async fn daily_history(&self, days: usize) -> Result<Vec<PricePoint>, anyhow::Error>;

    /// Like `daily_history`, tagged with the provider that actually answered.
    async fn fetch(&self, days: usize) -> Result<SourcedHistory, anyhow::Error> {
        let points = self.daily_history(days).await?;
        Ok(SourcedHistory { source: self.name().to_string(), points })
    }
}

/// Sort by time, drop non-finite prices and timestamps outside the calendar
/// range, and keep the last observation of each UTC calendar day.
pub fn normalize_daily(points: Vec<PricePoint>) -> Vec<PricePoint> {
    let mut dated: Vec<_> = points
        .into_iter()
        .filter(|p| p.price.is_finite())
        .filter_map(|p| DateTime::<Utc>::from_timestamp_millis(p.ts_ms).map(|d| (d.date_naive(), p)))
        .collect();
    dated.sort_by_key(|(_, p)| p.ts_ms);
    let mut out: Vec<(_, PricePoint)> = Vec::with_capacity(dated.len());
    for (day, p) in dated {
        match out.last_mut() {
            Some((last_day, last)) if *last_day == day => *last = p,
            _ => out.push((day, p)),
        }
    }
    out.into_iter().map(|(_, p)| p).collect()
}

/// Uses `fallback` whenever `primary` fails or returns nothing.
pub struct FallbackProvider {
    pub primary: Arc<dyn PriceHistoryProvider>,
    pub fallback: Arc<dyn PriceHistoryProvider>,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn PriceHistoryProvider>, fallback: Arc<dyn PriceHistoryProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PriceHistoryProvider for FallbackProvider {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn daily_history(&self, days: usize) -> Result<Vec<PricePoint>, anyhow::Error> {
        Ok(self.fetch(days).await?.points)
    }

    async fn fetch(&self, days: usize) -> Result<SourcedHistory, anyhow::Error> {
        match self.primary.fetch(days).await {
            Ok(history) if !history.points.is_empty() => Ok(history),
            Ok(_) => {
                tracing::warn!("{} returned no points; using {}", self.primary.name(), self.fallback.name());
                self.fallback.fetch(days).await
            }
            Err(err) => {
                tracing::warn!("{} failed: {err:?}; using {}", self.primary.name(), self.fallback.name());
                self.fallback.fetch(days).await
            }
        }
    }
}

pub mod file;
pub mod simulated;
