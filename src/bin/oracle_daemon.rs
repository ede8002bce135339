// src/bin/oracle_daemon.rs
use clap::Parser;
use sbtc_oracle::{
    config::OracleConfig,
    oracle::Oracle,
    providers::{file::JsonFileProvider, simulated::SimulatedProvider, FallbackProvider, PriceHistoryProvider},
    publishing::StdoutPublisher,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "oracle_daemon", about = "Compute and publish the SBTC target price")]
struct Args {
    /// TOML config; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON price history (array of {ts_ms, price}); simulated data is used
    /// when absent or unreadable.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Seed for the simulated history.
    #[arg(long)]
    seed: Option<u64>,
    /// Compute and publish once, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => OracleConfig::load(path)?,
        None => OracleConfig::default(),
    };

    let simulated = Arc::new(SimulatedProvider { seed: args.seed, ..SimulatedProvider::default() });
    let provider: Arc<dyn PriceHistoryProvider> = match &args.input {
        Some(path) => Arc::new(FallbackProvider::new(Arc::new(JsonFileProvider::new(path)), simulated)),
        None => simulated,
    };
    tracing::info!(symbol = %cfg.symbol, days = cfg.history_days, source = provider.name(), "starting oracle");

    let mut oracle = Oracle::new(cfg, StdoutPublisher, provider);
    if args.once {
        oracle.tick_once().await?;
    } else {
        oracle.run().await;
    }
    Ok(())
}
