// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by every request handler via `Arc<AppState>`. The engine itself is
// stateless, so nothing here needs a lock.
// =============================================================================

use std::time::Instant;

use serde::Serialize;

use crate::engine::FlowEngine;

pub struct AppState {
    pub engine: FlowEngine,
    /// Bearer token required on `/api/v1/*` data routes. `None` leaves them open.
    pub api_token: Option<String>,
    start_time: Instant,
}

/// Liveness payload for `/api/v1/health`.
#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub instruments: usize,
    pub lookback_days: u32,
    pub server_time: i64,
}

impl AppState {
    pub fn new(engine: FlowEngine, api_token: Option<String>) -> Self {
        Self {
            engine,
            api_token: api_token.filter(|t| !t.is_empty()),
            start_time: Instant::now(),
        }
    }

    pub fn health(&self) -> HealthSnapshot {
        let config = self.engine.config();
        HealthSnapshot {
            status: "ok",
            uptime_secs: self.start_time.elapsed().as_secs(),
            instruments: config.instruments.len(),
            lookback_days: config.lookback_days,
            server_time: chrono::Utc::now().timestamp_millis(),
        }
    }
}
