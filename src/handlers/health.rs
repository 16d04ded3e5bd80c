//! Health and service-info handlers.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{AppState, Result};

/// Liveness plus store health and engine counters.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health with engine counters")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.health_check().await))
}

/// Service info for the root path.
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Service metadata"))
)]
pub async fn service_info() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "docs": "/swagger-ui",
    }))
}
