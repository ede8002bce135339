// src/publishing.rs
use std::sync::Mutex;

use crate::types::OracleReport;

#[async_trait::async_trait]
pub trait Publisher: Send + Sync + 'static {
    /// Hand a computed target price to the downstream consumer.
    async fn publish_indicator(&self, report: OracleReport) -> anyhow::Result<()>;
}

/// Writes each report as one JSON line on stdout.
pub struct StdoutPublisher;

#[async_trait::async_trait]
impl Publisher for StdoutPublisher {
    async fn publish_indicator(&self, report: OracleReport) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string(&report)?);
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Default)]
pub struct MemoryPublisher {
    reports: Mutex<Vec<OracleReport>>,
}

impl MemoryPublisher {
    pub fn reports(&self) -> Vec<OracleReport> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Publisher for MemoryPublisher {
    async fn publish_indicator(&self, report: OracleReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .map_err(|_| anyhow::anyhow!("report store poisoned"))?
            .push(report);
        Ok(())
    }
}
