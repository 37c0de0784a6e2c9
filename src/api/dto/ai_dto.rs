//! DTOs for the advisory endpoints.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::advisor::{Advice, CategorizeItem, FestivalPlan, Source};
use crate::service::Insights;

/// Request body for `POST /ai/categorize`.
///
/// Either `items`, or `ownerId` to pull that owner's recent transactions.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeRequest {
    /// Explicit items.
    #[serde(default)]
    pub items: Option<Vec<CategorizeItem>>,
    /// Owner whose recent transactions to categorize.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// How many recent transactions to pull (default 50).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request body for `POST /ai/insights`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightsRequest {
    /// Owner to analyse.
    #[serde(default)]
    pub owner_id: String,
    /// Window start (`YYYY-MM-DD` or RFC 3339).
    #[serde(default)]
    pub from: Option<String>,
    /// Window end (`YYYY-MM-DD` means end of that day).
    #[serde(default)]
    pub to: Option<String>,
    /// Maximum expenses sampled (default 500).
    #[serde(default)]
    pub sample_limit: Option<usize>,
}

/// Response body for `POST /ai/insights`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
    /// Advice.
    pub advice: Advice,
    /// Strategy that produced the advice.
    pub source: Source,
    /// Expense total per category.
    pub summary: BTreeMap<String, Decimal>,
    /// Sum of sampled expenses.
    pub total_expense: Decimal,
}

impl From<Insights> for InsightsResponse {
    fn from(insights: Insights) -> Self {
        Self {
            advice: insights.advice,
            source: insights.source,
            summary: insights.summary,
            total_expense: insights.total_expense,
        }
    }
}

/// Request body for `POST /ai/festival`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FestivalPlanRequest {
    /// Festival day.
    #[serde(default)]
    pub festival_date: String,
    /// First day of saving; defaults to today.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Recent incomes, as context for the model.
    #[serde(default)]
    pub incomes: Vec<Decimal>,
    /// Amount to have saved by the festival.
    #[serde(default)]
    pub desired_budget: Decimal,
}

/// Response body for `POST /ai/festival`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FestivalPlanResponse {
    /// The plan.
    pub plan: FestivalPlan,
    /// Strategy that produced it.
    pub source: Source,
}

/// Request body for `POST /ai/event`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventBudgetRequest {
    /// Event name (default `Event`).
    #[serde(default)]
    pub event_name: Option<String>,
    /// Expected attendees (default 1).
    #[serde(default)]
    pub attendees_count: Option<u32>,
    /// Total budget.
    #[serde(default)]
    pub desired_budget: Decimal,
    /// Spending priorities, in order (default `Food, Venue, Gifts, Misc`).
    #[serde(default)]
    pub priorities: Vec<String>,
}
