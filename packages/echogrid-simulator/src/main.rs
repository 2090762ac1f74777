//! main.rs — EchoGrid source/listener simulator entry point
//!
//! Runs three concurrent pieces:
//!   1. Emitter loop: advances the random-walk source one grid step per
//!      period, generates per-microphone readings through the shared
//!      propagation + ADC chain, publishes them via MQTT
//!   2. Local estimator: decodes its own readings and runs the same
//!      engine the backend runs, so the control panel can show estimated
//!      vs ground-truth position live
//!   3. WebSocket control server: pause/resume, speed, scenario presets,
//!      ground-truth telemetry for error visualization

mod emitter;
mod mqtt_tx;
mod scenarios;
mod signal;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use echogrid_core::{AmplitudeMap, PositionEstimator, RoomConfig, RoomModel};

use emitter::SourceWalk;
use mqtt_tx::MqttTransmitter;
use scenarios::ScenarioConfig;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "echo-sim", about = "EchoGrid moving-source simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// MQTT broker host override
    #[arg(long)]
    broker: Option<String>,
    /// Simulation speed multiplier (1.0 = real-time)
    #[arg(long, default_value = "1.0")]
    speed: f64,
    /// Pre-load a scenario preset on startup (noisy | mic_dropout)
    #[arg(long)]
    preset: Option<String>,
    /// Control panel WebSocket port
    #[arg(long, default_value = "9090")]
    ctrl_port: u16,
}

// ── Shared state ──────────────────────────────────────────────────────────────

struct SimState {
    walk: SourceWalk,
    scenario: ScenarioConfig,
    paused: bool,
    epoch_counter: u32,
    speed: f64,
    /// Ground truth telemetry snapshot, broadcast to the control UI
    last_telemetry: Option<serde_json::Value>,
}

type SharedState = Arc<RwLock<SimState>>;

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echogrid_simulator=info".into()),
        )
        .init();

    let args = Args::parse();

    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let cfg: FullConfig = toml::from_str(&config_str)?;

    // Same fail-fast gate as the backend — a malformed room never runs
    let model = cfg.room.validate()?;
    info!(
        "🔊 EchoGrid simulator starting — {}x{} grid, {} mics, {} steps at {}s",
        model.grid.size(),
        model.grid.size(),
        model.mics.len(),
        cfg.simulation.steps,
        cfg.simulation.step_period_s
    );

    let scenario = match args.preset.as_deref() {
        Some("noisy") => scenarios::preset_noisy(),
        Some("mic_dropout") => scenarios::preset_mic_dropout(),
        Some(other) => {
            warn!("Unknown preset '{other}', starting clean");
            ScenarioConfig::default()
        }
        None => ScenarioConfig::default(),
    };

    let walk = SourceWalk::new(model.grid, &mut rand::thread_rng());
    info!("Source starts at cell ({}, {})", walk.cell().i, walk.cell().j);

    let shared: SharedState = Arc::new(RwLock::new(SimState {
        walk,
        scenario,
        paused: false,
        epoch_counter: 0,
        speed: args.speed,
        last_telemetry: None,
    }));

    // MQTT transmitter
    let broker_host = args.broker.unwrap_or_else(|| cfg.mqtt.host.clone());
    let tx = Arc::new(MqttTransmitter::new(
        &broker_host,
        cfg.mqtt.port,
        &cfg.mqtt.topic,
        &cfg.mqtt.client_id,
    ));
    info!("📡 Publishing to mqtt://{broker_host}:{} '{}'", cfg.mqtt.port, cfg.mqtt.topic);

    // Broadcast channel for telemetry (control UI)
    let (telem_tx, _) = broadcast::channel::<String>(64);
    let telem_tx = Arc::new(telem_tx);

    // Spawn emitter loop
    let shared_loop = shared.clone();
    let telem_loop = telem_tx.clone();
    let sim_cfg = cfg.simulation;
    tokio::spawn(async move {
        sim_loop(shared_loop, model, tx, telem_loop, sim_cfg).await;
    });

    // Control WebSocket server
    let ctrl_addr = format!("0.0.0.0:{}", args.ctrl_port);
    info!("🖥  Control panel WebSocket at ws://{ctrl_addr}/ws");

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "echo-sim ok" }))
        .with_state((shared.clone(), telem_tx.clone()))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let listener = tokio::net::TcpListener::bind(&ctrl_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Emitter loop ──────────────────────────────────────────────────────────────

async fn sim_loop(
    state: SharedState,
    model: RoomModel,
    tx: Arc<MqttTransmitter>,
    telem: Arc<broadcast::Sender<String>>,
    cfg: SimulationConfig,
) {
    // The sim runs the same engine the backend runs, purely for live
    // estimated-vs-truth display on the control panel
    let map = AmplitudeMap::build(model.grid, &model.mics, &model.propagation);
    let estimator = PositionEstimator::new(map, model.mics.clone());
    // StdRng, not thread_rng: this future must stay Send
    let mut rng = StdRng::from_entropy();

    loop {
        let (paused, speed) = {
            let s = state.read().await;
            (s.paused, s.speed)
        };
        tokio::time::sleep(Duration::from_secs_f64(cfg.step_period_s / speed.max(0.1))).await;
        if paused {
            continue;
        }

        // Batch key: wall-clock second, same as the real listener nodes.
        // Stepping faster than 1 Hz folds steps into one epoch; the
        // backend's last-wins overwrite handles that.
        let epoch_s = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let (readings, telemetry_json) = {
            let mut s = state.write().await;
            s.walk.step(&mut rng);
            s.epoch_counter += 1;
            let epoch_counter = s.epoch_counter;
            let cell = s.walk.cell();
            let source = s.walk.position();

            let readings = signal::generate_epoch(
                epoch_s,
                source,
                &model.mics,
                &model.propagation,
                &model.codec,
                s.scenario.noise_sigma(),
                &mut rng,
            );

            // Scenario: silence a dropped microphone's reading
            let readings: Vec<_> = readings
                .into_iter()
                .filter(|r| !s.scenario.is_mic_dropped(r.mic_id, epoch_counter))
                .collect();

            // Local decode + estimate for the error display
            let decoded: std::collections::BTreeMap<u32, f64> = readings
                .iter()
                .filter_map(|r| {
                    model.codec.decode(&r.amplitude_bits).ok().map(|a| (r.mic_id, a))
                })
                .collect();
            let estimate = estimator.estimate(&decoded);

            let full_telem = serde_json::json!({
                "type":    "telemetry",
                "epoch":   epoch_counter,
                "epoch_s": epoch_s,
                "gt": {
                    "i": cell.i, "j": cell.j,
                    "x": source.x, "y": source.y,
                },
                "estimated": estimate.map(|e| serde_json::json!({
                    "x": e.snapped.x,
                    "y": e.snapped.y,
                    "err": e.squared_error,
                })),
                "readings": readings.iter().map(|r| serde_json::json!({
                    "mic_id": r.mic_id,
                    "bits":   r.amplitude_bits,
                })).collect::<Vec<_>>(),
                "scenario": s.scenario,
            });
            s.last_telemetry = Some(full_telem.clone());

            if epoch_counter % 10 == 0 {
                info!(
                    "--> step {} | cell ({}, {}) at ({:.2}, {:.2}) | {} readings",
                    epoch_counter, cell.i, cell.j, source.x, source.y, readings.len()
                );
            }

            if cfg.steps > 0 && epoch_counter >= cfg.steps {
                info!("Simulation finished after {} steps", cfg.steps);
                s.paused = true;
            }
            (readings, full_telem.to_string())
        };

        // Publish outside the state lock
        tx.send_epoch(&readings).await;

        // Broadcast to the control UI
        let _ = telem.send(telemetry_json);
    }
}

// ── WebSocket control handler ─────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State((state, telem_tx)): State<(SharedState, Arc<broadcast::Sender<String>>)>,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state, telem_tx))
}

async fn handle_ws(
    mut socket: WebSocket,
    state: SharedState,
    telem_tx: Arc<broadcast::Sender<String>>,
) {
    let mut telem_rx = telem_tx.subscribe();

    // Send current state immediately on connect
    if let Some(telem) = state.read().await.last_telemetry.as_ref() {
        let _ = socket.send(Message::Text(telem.to_string())).await;
    }

    loop {
        tokio::select! {
            // Relay telemetry to the client
            Ok(msg) = telem_rx.recv() => {
                if socket.send(Message::Text(msg)).await.is_err() { break; }
            }
            // Handle commands from the control UI
            Some(Ok(Message::Text(cmd))) = socket.recv() => {
                handle_command(&state, &cmd).await;
            }
            else => break,
        }
    }
}

/// Handle commands from the control panel.
/// Commands are JSON: { "cmd": "...", "args": {...} }
async fn handle_command(state: &SharedState, raw: &str) {
    let v: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return,
    };
    let cmd = v["cmd"].as_str().unwrap_or("");
    match cmd {
        "pause" => {
            state.write().await.paused = true;
            info!("⏸ Sim paused");
        }
        "resume" => {
            state.write().await.paused = false;
            info!("▶ Sim resumed");
        }
        "set_speed" => {
            if let Some(sp) = v["args"]["speed"].as_f64() {
                state.write().await.speed = sp.clamp(0.1, 20.0);
                info!("⚡ Sim speed set to {sp}×");
            }
        }
        "set_scenario" => {
            if let Ok(sc) = serde_json::from_value::<ScenarioConfig>(v["args"].clone()) {
                state.write().await.scenario = sc;
                info!("🎭 Scenario updated");
            }
        }
        "preset" => {
            let preset = v["args"]["name"].as_str().unwrap_or("");
            let sc = match preset {
                "noisy" => scenarios::preset_noisy(),
                "mic_dropout" => scenarios::preset_mic_dropout(),
                "default" => ScenarioConfig::default(),
                _ => {
                    warn!("Unknown preset: {preset}");
                    return;
                }
            };
            state.write().await.scenario = sc;
            info!("🎭 Preset '{preset}' loaded");
        }
        _ => warn!("Unknown control command: {cmd}"),
    }
}

// ── Config structs ────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct FullConfig {
    room: RoomConfig,
    simulation: SimulationConfig,
    mqtt: MqttConfig,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct SimulationConfig {
    /// Seconds between emitter steps (1.0 matches the 1 Hz listener epoch)
    step_period_s: f64,
    /// Stop (pause) after this many steps; 0 = run forever
    steps: u32,
}

#[derive(Debug, serde::Deserialize)]
struct MqttConfig {
    host: String,
    port: u16,
    topic: String,
    client_id: String,
}
