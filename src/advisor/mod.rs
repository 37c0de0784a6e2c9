//! Advisory capabilities backed by an optional language model.
//!
//! Every capability here is a deterministic, total function with a remote
//! layer on top. When a [`ChatModel`] is configured the remote answer is
//! tried first; any transport error, timeout or unparseable reply falls
//! back to the deterministic result. [`GatewayError::UpstreamUnavailable`]
//! never leaves this module.
//!
//! [`GatewayError::UpstreamUnavailable`]: crate::error::GatewayError::UpstreamUnavailable

pub mod categorizer;
pub mod insights;
pub mod llm;
pub mod planner;

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

pub use categorizer::{Categorization, CategorizeItem, CategoryAssignment, Categorizer};
pub use insights::{Advice, InsightAdvisor, SpendingSummary};
pub use llm::{ChatModel, CompletionOptions, OpenAiChat};
pub use planner::{EventBudget, EventRequest, FestivalPlan, FestivalPlanner, FestivalRequest};

/// Which strategy produced a capability's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The remote model's answer was used.
    Ai,
    /// The deterministic rules produced the answer.
    Rules,
}

/// The capability bundle handed to the services.
#[derive(Debug, Clone)]
pub struct Advisor {
    /// Transaction categorization.
    pub categorizer: Categorizer,
    /// Spending advice.
    pub insights: InsightAdvisor,
    /// Festival savings plans.
    pub festival: FestivalPlanner,
}

impl Advisor {
    /// Wires all capabilities to the same optional model.
    #[must_use]
    pub fn new(model: Option<Arc<dyn ChatModel>>, max_batch: usize) -> Self {
        Self {
            categorizer: Categorizer::new(model.clone(), max_batch),
            insights: InsightAdvisor::new(model.clone()),
            festival: FestivalPlanner::new(model),
        }
    }

    /// Deterministic capabilities only.
    #[must_use]
    pub fn rules_only() -> Self {
        Self::new(None, 0)
    }
}
