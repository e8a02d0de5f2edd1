/// Health and status endpoints
///
/// # Endpoints
///
/// ```text
/// GET /health
/// GET /status
/// ```
///
/// `/health` reports each dependency separately:
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "cache": "connected"
/// }
/// ```
///
/// Status is `"degraded"` when any dependency is unreachable; the endpoint
/// still answers 200 so load balancers can read the body.

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub cache: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub storage_backend: String,
    pub cache_backend: String,
}

fn connectivity(ok: bool) -> &'static str {
    if ok {
        "connected"
    } else {
        "disconnected"
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = match state.storage.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            false
        }
    };
    let cache_ok = match state.cache.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if database_ok && cache_ok {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: connectivity(database_ok).to_string(),
        cache: connectivity(cache_ok).to_string(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: "Rollcall API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_backend: state.storage.backend_name().to_string(),
        cache_backend: state.cache.store().backend_name().to_string(),
    })
}
