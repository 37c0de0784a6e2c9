//! System endpoints: health check and reward catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::RewardDefinition;
use crate::error::{ErrorResponse, GatewayError};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/rewards`: The reward catalog.
///
/// # Errors
///
/// Returns [`GatewayError`] if the catalog cannot be read.
#[utoipa::path(
    get,
    path = "/config/rewards",
    tag = "System",
    summary = "List reward catalog",
    description = "Returns the coupon configured for each tier, gold first.",
    responses(
        (status = 200, description = "Reward catalog", body = Vec<RewardDefinition>),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn rewards_catalog_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let catalog = state.rewards.catalog().await?;
    Ok(Json(catalog))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/rewards", get(rewards_catalog_handler))
}
