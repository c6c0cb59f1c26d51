//! Health check handlers.

use axum::Json;
use axum::extract::State;

use kanri_core::traits::CacheProvider;

use crate::dto::response::{DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// GET /api/health/detailed
pub async fn detailed_health(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
    {
        Ok(_) => "ok",
        Err(_) => "unavailable",
    };

    let cache = match state.cache.health_check().await {
        Ok(true) => "ok",
        _ => "unavailable",
    };

    let status = if database == "ok" && cache == "ok" {
        "ok"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        cache: cache.to_string(),
    })
}
