//! api.rs — HTTP surface for the room view
//!
//! Read-only endpoints: recent positions for plotting and the static room
//! layout (grid + microphones) so a UI can draw itself without its own
//! copy of the configuration.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use echogrid_core::RoomModel;

use crate::persistence::{PositionStore, StoredFix};

#[derive(Debug, Clone, Serialize)]
pub struct MicSummary {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

/// Static room layout, as served by `/api/room`.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub grid_size: u32,
    pub cell_size_m: f64,
    pub side_m: f64,
    pub microphones: Vec<MicSummary>,
}

impl From<&RoomModel> for RoomSummary {
    fn from(model: &RoomModel) -> Self {
        Self {
            grid_size: model.grid.size(),
            cell_size_m: model.grid.cell_m(),
            side_m: model.grid.side_m(),
            microphones: model
                .mics
                .iter()
                .map(|m| MicSummary { id: m.id, x: m.pos.x, y: m.pos.y })
                .collect(),
        }
    }
}

#[derive(Clone)]
struct ApiState {
    store: Arc<PositionStore>,
    room: RoomSummary,
}

pub fn router(store: Arc<PositionStore>, room: RoomSummary) -> Router {
    // CORS wide open — the room view is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "echogrid-backend ok" }))
        .route("/api/positions", get(positions))
        .route("/api/room", get(room_info))
        .with_state(ApiState { store, room })
        .layer(cors)
}

/// Last 50 corrected fixes, chronological
async fn positions(State(state): State<ApiState>) -> Json<Vec<StoredFix>> {
    Json(state.store.recent().await)
}

async fn room_info(State(state): State<ApiState>) -> Json<RoomSummary> {
    Json(state.room.clone())
}
