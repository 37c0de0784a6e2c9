//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; health, catalog and the
//! OpenAPI document live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "spendwise-gateway",
        description = "Spending insights, transaction categorization, and tiered coupon rewards."
    ),
    paths(
        handlers::rewards::evaluate_reward,
        handlers::rewards::list_rewards,
        handlers::rewards::redeem_reward,
        handlers::ai::categorize,
        handlers::ai::insights,
        handlers::ai::festival_plan,
        handlers::ai::event_budget,
        handlers::transactions::list_transactions,
        handlers::transactions::record_transactions,
        handlers::system::health_handler,
        handlers::system::rewards_catalog_handler,
    ),
    tags(
        (name = "Rewards", description = "Tier evaluation, coupon issuance and redemption"),
        (name = "AI", description = "Categorization, advice and planners with rule-based fallback"),
        (name = "Transactions", description = "Income and expense records"),
        (name = "System", description = "Health and configuration"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(docs_routes())
}

#[cfg(feature = "swagger-ui")]
fn docs_routes() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
