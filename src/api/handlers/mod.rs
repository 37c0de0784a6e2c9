//! REST endpoint handlers organized by resource.

pub mod ai;
pub mod rewards;
pub mod system;
pub mod transactions;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(rewards::routes())
        .merge(ai::routes())
        .merge(transactions::routes())
}
