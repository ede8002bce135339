// src/providers/file.rs
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;

use super::{normalize_daily, PriceHistoryProvider};
use crate::types::PricePoint;

/// Reads a JSON array of `{"ts_ms": .., "price": ..}` objects.
pub struct JsonFileProvider {
    pub path: PathBuf,
    label: String,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("file:{}", path.display());
        Self { path, label }
    }
}

#[async_trait]
impl PriceHistoryProvider for JsonFileProvider {
    fn name(&self) -> &str {
        &self.label
    }

    async fn daily_history(&self, days: usize) -> Result<Vec<PricePoint>, anyhow::Error> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        let points: Vec<PricePoint> =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))?;
        let mut daily = normalize_daily(points);
        if daily.len() > days {
            daily.drain(..daily.len() - days);
        }
        Ok(daily)
    }
}
