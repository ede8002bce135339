// src/oracle.rs
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{secs, OracleConfig};
use crate::indicator::{IndexBuilder, IndicatorError, IndicatorPipeline, MaBlendIndex};
use crate::providers::{PriceHistoryProvider, SourcedHistory};
use crate::publishing::Publisher;
use crate::risk::RiskEngine;
use crate::types::{scale_by_expo, series_digest, spot_price, IndicatorResult, OracleReport, PricePoint};

#[cfg(feature = "metrics")]
fn count_tick(outcome: &str) {
    crate::metrics::TICKS_TOTAL.with_label_values(&[outcome]).inc();
}
#[cfg(not(feature = "metrics"))]
fn count_tick(_outcome: &str) {}

#[cfg(feature = "metrics")]
fn count_failure(reason: &str) {
    crate::metrics::FAILURES_TOTAL.with_label_values(&[reason]).inc();
}
#[cfg(not(feature = "metrics"))]
fn count_failure(_reason: &str) {}

#[cfg(feature = "metrics")]
fn observe_latency(source: &str, started: Instant) {
    crate::metrics::COMPUTE_LATENCY
        .with_label_values(&[source])
        .observe(started.elapsed().as_secs_f64());
}
#[cfg(not(feature = "metrics"))]
fn observe_latency(_source: &str, _started: Instant) {}

pub struct Oracle<Pu>
where
    Pu: Publisher + Send + Sync + 'static,
{
    pub cfg: OracleConfig,
    pub publisher: Pu,
    pub provider: Arc<dyn PriceHistoryProvider>,
    pub last_published: Option<OracleReport>,
    pipeline: IndicatorPipeline,
    fallback: Option<Box<dyn IndexBuilder>>,
    risk: RiskEngine,
}

impl<Pu> Oracle<Pu>
where
    Pu: Publisher + Send + Sync + 'static,
{
    pub fn new(cfg: OracleConfig, publisher: Pu, provider: Arc<dyn PriceHistoryProvider>) -> Self {
        let pipeline = IndicatorPipeline::new(cfg.indicator, cfg.clamp).with_expo(cfg.expo);
        let fallback: Option<Box<dyn IndexBuilder>> = if cfg.fallback_blend {
            Some(Box::new(MaBlendIndex::new(cfg.expo)))
        } else {
            None
        };
        Self {
            risk: RiskEngine::new(cfg.sanity_band_ratio),
            pipeline,
            fallback,
            cfg,
            publisher,
            provider,
            last_published: None,
        }
    }

    /// Full indicator first; the fallback estimate only when the series is
    /// too short or the indicator ends undefined.
    pub fn compute(&self, series: &[PricePoint]) -> Result<(IndicatorResult, &'static str), IndicatorError> {
        let started = Instant::now();
        let primary = self.pipeline.build(series);
        observe_latency(self.pipeline.source(), started);
        match (primary, &self.fallback) {
            (Ok(r), _) => Ok((r, self.pipeline.source())),
            (Err(e @ (IndicatorError::InsufficientData { .. } | IndicatorError::ComputationUndefined)), Some(fb)) => {
                count_failure(self.risk.map_index_error(&e));
                tracing::warn!("indicator unavailable ({e}); using {}", fb.source());
                let started = Instant::now();
                let r = fb.build(series)?;
                observe_latency(fb.source(), started);
                Ok((r, fb.source()))
            }
            (Err(e), _) => Err(e),
        }
    }

    /// Fetch, compute, check and publish once. `Ok(None)` means the value
    /// was computed but rejected by the sanity band or the publisher.
    pub async fn tick_once(&mut self) -> anyhow::Result<Option<OracleReport>> {
        let SourcedHistory { source: data_source, points: series } =
            self.provider.fetch(self.cfg.history_days).await?;
        tracing::debug!(points = series.len(), source = %data_source, "history fetched");

        let (result, source) = match self.compute(&series) {
            Ok(x) => x,
            Err(e) => {
                count_failure(self.risk.map_index_error(&e));
                count_tick("failed");
                return Err(e.into());
            }
        };
        let (target, scaled) = match (result.current_value, result.scaled_integer) {
            (Some(v), Some(s)) => (v, s),
            _ => return Err(IndicatorError::ComputationUndefined.into()),
        };
        let spot = spot_price(&series).ok_or(IndicatorError::InsufficientData { have: 0, need: 1 })?;
        let spot_scaled = scale_by_expo(spot, self.cfg.expo)?;

        if !self.risk.within_band(scaled, spot_scaled) {
            tracing::warn!(target_price = target, spot, ratio = self.risk.band_ratio, "target outside sanity band; not publishing");
            count_tick("rejected");
            return Ok(None);
        }

        let report = OracleReport {
            symbol: self.cfg.symbol.clone(),
            spot_price: spot,
            target_price: target,
            target_scaled: scaled,
            expo: self.cfg.expo,
            data_points_used: series.len(),
            computed_at_ms: Utc::now().timestamp_millis(),
            data_source,
            indicator_source: source.to_string(),
            series_digest: series_digest(&series),
        };

        if let Err(e) = self.publisher.publish_indicator(report.clone()).await {
            tracing::warn!("publish_indicator failed: {e:?}");
            count_tick("failed");
            return Ok(None);
        }
        tracing::info!(
            symbol = %report.symbol,
            target_price = report.target_price,
            scaled = report.target_scaled,
            source = %report.indicator_source,
            "published target price"
        );
        count_tick(if source == self.pipeline.source() { "published" } else { "fallback" });
        self.last_published = Some(report.clone());
        Ok(Some(report))
    }

    /// Tick every `poll_secs` forever; failures are logged and retried on
    /// the next tick.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(secs(self.cfg.poll_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick_once().await {
                tracing::warn!("tick failed: {e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::file::JsonFileProvider;
    use crate::providers::simulated::SimulatedProvider;
    use crate::providers::FallbackProvider;
    use crate::publishing::MemoryPublisher;

    fn oracle(cfg: OracleConfig, days_seed: u64) -> Oracle<MemoryPublisher> {
        let provider = Arc::new(SimulatedProvider { end_ms: Some(1_700_006_400_000), ..SimulatedProvider::seeded(days_seed) });
        Oracle::new(cfg, MemoryPublisher::default(), provider)
    }

    #[tokio::test]
    async fn publishes_full_indicator() {
        let cfg = OracleConfig { history_days: 400, sanity_band_ratio: 10.0, ..OracleConfig::default() };
        let mut o = oracle(cfg, 11);
        let report = o.tick_once().await.unwrap().expect("published");
        assert_eq!(report.indicator_source, "sbtc");
        assert_eq!(report.data_points_used, 400);
        assert_eq!(report.data_source, "simulated");
        assert_eq!(report.series_digest.len(), 64);
        assert!((report.target_scaled as f64 / 100.0 - report.target_price).abs() <= 0.01);
        assert_eq!(o.publisher.reports(), vec![report.clone()]);
        assert_eq!(o.last_published, Some(report));
    }

    #[tokio::test]
    async fn short_history_falls_back_to_blend() {
        let cfg = OracleConfig { history_days: 40, ..OracleConfig::default() };
        let mut o = oracle(cfg, 5);
        let report = o.tick_once().await.unwrap().expect("published");
        assert_eq!(report.indicator_source, "ma-blend");
    }

    #[tokio::test]
    async fn short_history_without_fallback_fails() {
        let cfg = OracleConfig { history_days: 40, fallback_blend: false, ..OracleConfig::default() };
        let mut o = oracle(cfg, 5);
        let err = o.tick_once().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndicatorError>(),
            Some(IndicatorError::InsufficientData { have: 40, .. })
        ));
        assert!(o.publisher.reports().is_empty());
    }

    #[tokio::test]
    async fn report_names_the_provider_that_served() {
        let cfg = OracleConfig { history_days: 400, sanity_band_ratio: 10.0, ..OracleConfig::default() };
        let simulated = SimulatedProvider { end_ms: Some(1_700_006_400_000), ..SimulatedProvider::seeded(11) };
        let provider = FallbackProvider::new(
            Arc::new(JsonFileProvider::new("/nonexistent/prices.json")),
            Arc::new(simulated),
        );
        let mut o = Oracle::new(cfg, MemoryPublisher::default(), Arc::new(provider));
        let report = o.tick_once().await.unwrap().expect("published");
        assert_eq!(report.data_source, "simulated");
    }

    #[tokio::test]
    async fn misconfigured_length_fails_instead_of_blending() {
        let mut cfg = OracleConfig { history_days: 400, ..OracleConfig::default() };
        cfg.indicator.length = 3;
        let mut o = oracle(cfg, 11);
        let err = o.tick_once().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<IndicatorError>(), Some(IndicatorError::InvalidInput(_))));
        assert!(o.publisher.reports().is_empty());
    }

    #[tokio::test]
    async fn narrow_band_rejects_publication() {
        let cfg = OracleConfig { history_days: 400, sanity_band_ratio: 1.0, ..OracleConfig::default() };
        let mut o = oracle(cfg, 11);
        assert_eq!(o.tick_once().await.unwrap(), None);
        assert!(o.publisher.reports().is_empty());
        assert!(o.last_published.is_none());
    }
}
