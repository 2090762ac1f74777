mod api;
mod ingest;
mod persistence;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use echogrid_core::{
    AmplitudeMap, BatcherConfig, EpochBatcher, PositionEstimator, PositionFix, RoomConfig,
};

use ingest::IngestConfig;
use persistence::PositionStore;

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "echogrid-backend", about = "EchoGrid acoustic localization backend")]
struct Args {
    /// Room configuration file (grid, microphones, ADC link)
    #[arg(short, long, default_value = "room.toml")]
    config: String,
}

/// Top-level config file shape: `[room]` plus optional batching overrides.
#[derive(Debug, serde::Deserialize)]
struct BackendConfig {
    room: RoomConfig,
    #[serde(default)]
    batching: BatchingConfig,
}

#[derive(Debug, serde::Deserialize)]
struct BatchingConfig {
    /// Max simultaneously pending epochs
    max_pending: usize,
    /// Incomplete batches older than this are evicted, seconds
    max_age_s: u64,
    /// Sweep period, seconds
    sweep_period_s: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self { max_pending: 64, max_age_s: 10, sweep_period_s: 5 }
    }
}

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echogrid_backend=info".into()),
        )
        .init();

    info!("🔊 EchoGrid backend starting...");

    let args = Args::parse();
    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../room.toml").to_string());
    let cfg: BackendConfig = toml::from_str(&config_str)?;

    // Malformed room configuration is fatal — refuse to build a map from it
    let model = cfg.room.validate()?;
    info!(
        "Room: {}x{} cells of {}m, {} microphones, K={}",
        model.grid.size(),
        model.grid.size(),
        model.grid.cell_m(),
        model.mics.len(),
        model.propagation.k()
    );

    // Precompute the amplitude table once; read-only from here on
    let t0 = Instant::now();
    let map = AmplitudeMap::build(model.grid, &model.mics, &model.propagation);
    info!("Amplitude map ready: {} cells in {:?}", map.len(), t0.elapsed());
    let estimator = Arc::new(PositionEstimator::new(map, model.mics.clone()));

    let batcher = Arc::new(Mutex::new(EpochBatcher::new(BatcherConfig {
        expected_readings: model.mics.len(),
        max_pending: cfg.batching.max_pending,
        max_age: Duration::from_secs(cfg.batching.max_age_s),
    })));

    // Persistence
    let store = Arc::new(PositionStore::connect().await);
    let (fix_tx, fix_rx) = mpsc::channel::<PositionFix>(64);
    tokio::spawn(persistence::run_store(store.clone(), fix_rx));

    // Stale-batch sweeper
    tokio::spawn(ingest::run_sweep(
        batcher.clone(),
        Duration::from_secs(cfg.batching.sweep_period_s),
    ));

    // MQTT ingestion
    tokio::spawn(ingest::run_ingest(
        IngestConfig::default(),
        model.codec,
        estimator,
        batcher,
        fix_tx,
    ));

    // HTTP API
    let app = api::router(store, api::RoomSummary::from(&model));
    let port = std::env::var("PORT").unwrap_or_else(|_| "8088".to_string());
    let addr = format!("0.0.0.0:{port}");
    info!("🚀 API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
