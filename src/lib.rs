//! # spendwise-gateway
//!
//! REST gateway for a personal-finance app: transaction recording,
//! categorization, spending advice, and a tiered coupon-reward engine.
//!
//! The reward engine sums an owner's monthly expenses, compares them to a
//! stated or estimated budget, maps the ratio to gold/silver/bronze, and
//! issues the tier's coupon at most once while it stays active.
//! Categorization and advice use an optional language model and always
//! fall back to deterministic rules.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── RewardService / InsightService / TransactionService (service/)
//!     ├── Advisor capabilities (advisor/)  ── optional LLM (reqwest)
//!     ├── Pure decision logic (domain/)
//!     │
//!     └── Stores (persistence/): in-memory or PostgreSQL
//! ```

pub mod advisor;
pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the fully layered application router.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
