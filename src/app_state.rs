//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{InsightService, RewardService, TransactionService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Reward engine.
    pub rewards: Arc<RewardService>,
    /// Categorization, advice and planners.
    pub insights: Arc<InsightService>,
    /// Transaction listing and recording.
    pub transactions: Arc<TransactionService>,
}
