//! # ingest
//!
//! Amplitude ingestion hub — receives per-microphone readings from the
//! listener nodes via MQTT, decodes the ADC bit payloads, and batches them
//! per measurement epoch. A completed epoch (one reading per configured
//! microphone) triggers exactly one estimation, whose fix goes down an
//! mpsc channel to the persistence task.
//!
//! ## Architecture
//! This module runs as a separate Tokio task alongside the HTTP API. It:
//!   1. Connects to the broker and subscribes to the amplitudes topic
//!   2. Parses JSON [`AmplitudeReading`] envelopes
//!   3. Decodes bit payloads through the shared [`AdcCodec`]
//!   4. Feeds the mutex-guarded [`EpochBatcher`]; insert-and-check is one
//!      locked step, so two concurrent arrivals cannot both see an
//!      incomplete batch
//!   5. Runs the estimator on completed batches *outside* the batcher lock
//!      (pure CPU work, nothing awaits while the lock is held)
//!
//! ## Invariants
//! - Malformed payloads are logged and skipped; broker errors back off and
//!   retry. The ingest loop never crashes the backend.
//! - Partial batches never reach the estimator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use echogrid_core::{AdcCodec, AmplitudeReading, EpochBatcher, PositionEstimator, PositionFix};

// ── Configuration ─────────────────────────────────────────────────────────────

pub struct IngestConfig {
    /// MQTT broker host (default localhost)
    pub broker_host: String,
    /// MQTT broker port (default 1883)
    pub broker_port: u16,
    /// Amplitudes topic shared with the listener nodes
    pub topic: String,
    pub client_id: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            broker_host: std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string()),
            broker_port: std::env::var("MQTT_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1883),
            topic: std::env::var("MQTT_TOPIC")
                .unwrap_or_else(|_| "echogrid/room/amplitudes".to_string()),
            client_id: "echogrid-backend".to_string(),
        }
    }
}

// ── Main MQTT listener task ───────────────────────────────────────────────────

/// Run the ingestion loop until the process exits.
pub async fn run_ingest(
    cfg: IngestConfig,
    codec: AdcCodec,
    estimator: Arc<PositionEstimator>,
    batcher: Arc<Mutex<EpochBatcher>>,
    fix_tx: mpsc::Sender<PositionFix>,
) {
    let mut options = MqttOptions::new(&cfg.client_id, &cfg.broker_host, cfg.broker_port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(options, 32);

    info!(
        "📡 Amplitude ingest connecting to mqtt://{}:{} topic '{}'",
        cfg.broker_host, cfg.broker_port, cfg.topic
    );

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                // (Re)subscribe on every successful connection
                info!("MQTT connected, subscribing to '{}'", cfg.topic);
                if let Err(e) = client.subscribe(&cfg.topic, QoS::AtLeastOnce).await {
                    warn!("MQTT subscribe failed: {e}");
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_payload(&publish.payload, &codec, &estimator, &batcher, &fix_tx).await;
            }
            Ok(_) => {}
            Err(e) => {
                // Broker down or network drop — back off and let rumqttc reconnect
                warn!("MQTT connection error: {e} — retrying in 2s");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn handle_payload(
    payload: &[u8],
    codec: &AdcCodec,
    estimator: &Arc<PositionEstimator>,
    batcher: &Arc<Mutex<EpochBatcher>>,
    fix_tx: &mpsc::Sender<PositionFix>,
) {
    let reading: AmplitudeReading = match serde_json::from_slice(payload) {
        Ok(r) => r,
        Err(e) => {
            debug!("ingest: malformed amplitude message: {e}");
            return;
        }
    };

    let amplitude = match codec.decode(&reading.amplitude_bits) {
        Ok(a) => a,
        Err(e) => {
            warn!("ingest: mic {} epoch {}: {e}", reading.mic_id, reading.epoch_s);
            return;
        }
    };
    debug!(
        "ingest: epoch {} mic {} -> {:.2}",
        reading.epoch_s, reading.mic_id, amplitude
    );

    // Insert and completeness check as one locked read-modify-write
    let completed = {
        let mut b = batcher.lock().await;
        b.insert(reading.epoch_s, reading.mic_id, amplitude, Instant::now())
    };

    let Some(readings) = completed else { return };

    // Pure CPU scan, deliberately outside the batcher lock
    if let Some(est) = estimator.estimate(&readings) {
        info!(
            "epoch {}: raw ({:.2}, {:.2}) -> snapped ({:.2}, {:.2}) err={:.1}",
            reading.epoch_s,
            est.raw.x,
            est.raw.y,
            est.snapped.x,
            est.snapped.y,
            est.squared_error
        );
        let fix = PositionFix {
            epoch_s: reading.epoch_s,
            x_m: est.snapped.x,
            y_m: est.snapped.y,
            squared_error: est.squared_error,
        };
        // Persistence lag must not block ingestion
        if fix_tx.try_send(fix).is_err() {
            warn!("fix channel full — dropping epoch {}", reading.epoch_s);
        }
    }
}

// ── Stale-batch sweep task ────────────────────────────────────────────────────

/// Periodically evict half-filled batches so irregular arrival timing
/// (a silent microphone, a dropped message) cannot grow the buffer.
pub async fn run_sweep(batcher: Arc<Mutex<EpochBatcher>>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let evicted = batcher.lock().await.sweep(Instant::now());
        if evicted > 0 {
            warn!("evicted {evicted} stale incomplete batch(es)");
        }
    }
}
