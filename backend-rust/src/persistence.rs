//! persistence.rs — position history
//!
//! Every corrected fix lands in two places: an in-memory ring of the last
//! 50 positions (served by the HTTP API) and, when `DATABASE_URL` is set,
//! a Postgres `positions` table. A missing or failing database degrades to
//! log-only mode — persistence problems are never allowed to reach the
//! estimation core.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use echogrid_core::PositionFix;

/// Ring depth — matches what the room view plots
const RECENT_CAPACITY: usize = 50;

/// One stored position, as served by `/api/positions`.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFix {
    pub x: f64,
    pub y: f64,
    pub time: DateTime<Utc>,
    pub epoch_s: u64,
    pub squared_error: f64,
}

pub struct PositionStore {
    pool: Option<PgPool>,
    recent: RwLock<VecDeque<StoredFix>>,
}

impl PositionStore {
    /// Connect to Postgres if `DATABASE_URL` is configured; otherwise run
    /// with the in-memory ring only.
    pub async fn connect() -> Self {
        let pool = match std::env::var("DATABASE_URL") {
            Ok(url) => match PgPoolOptions::new().max_connections(4).connect(&url).await {
                Ok(pool) => {
                    if let Err(e) = init_schema(&pool).await {
                        warn!("positions schema init failed: {e}");
                    }
                    info!("💾 Position history connected to Postgres");
                    Some(pool)
                }
                Err(e) => {
                    warn!("could not connect to DATABASE_URL: {e} — running log-only");
                    None
                }
            },
            Err(_) => {
                warn!("DATABASE_URL not set — position history is in-memory only");
                None
            }
        };
        Self {
            pool,
            recent: RwLock::new(VecDeque::with_capacity(RECENT_CAPACITY)),
        }
    }

    /// Record one corrected fix. Insert failures are logged and dropped;
    /// the core owes no retry.
    pub async fn record(&self, fix: PositionFix) {
        let stored = StoredFix {
            x: fix.x_m,
            y: fix.y_m,
            time: Utc::now(),
            epoch_s: fix.epoch_s,
            squared_error: fix.squared_error,
        };

        {
            let mut ring = self.recent.write().await;
            if ring.len() >= RECENT_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(stored.clone());
        }

        if let Some(pool) = &self.pool {
            let insert = sqlx::query(
                "INSERT INTO positions (pos_x, pos_y, recorded_at) VALUES ($1, $2, $3)",
            )
            .bind(stored.x)
            .bind(stored.y)
            .bind(stored.time)
            .execute(pool)
            .await;
            if let Err(e) = insert {
                warn!("position insert failed: {e}");
            }
        }
    }

    /// Latest fixes in chronological order.
    pub async fn recent(&self) -> Vec<StoredFix> {
        self.recent.read().await.iter().cloned().collect()
    }
}

async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS positions (
            id BIGSERIAL PRIMARY KEY,
            pos_x DOUBLE PRECISION NOT NULL,
            pos_y DOUBLE PRECISION NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Drain the fix channel into the store until the ingest side closes it.
pub async fn run_store(store: Arc<PositionStore>, mut fix_rx: mpsc::Receiver<PositionFix>) {
    while let Some(fix) = fix_rx.recv().await {
        store.record(fix).await;
    }
    info!("fix channel closed — persistence task exiting");
}
