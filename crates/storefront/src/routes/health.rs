//! Liveness endpoint.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// `{ status, database, timestamp }`.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// `GET /api/health`
///
/// Always 200 while the process is up; store reachability is reported in
/// `database`.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let database = match state.store().ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store unreachable");
            "disconnected"
        }
    };

    Json(HealthStatus {
        status: "ok",
        database,
        timestamp: Utc::now(),
    })
}
