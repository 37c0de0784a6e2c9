//! Advisory handlers: categorize, insights, festival and event planning.
//!
//! These endpoints never fail because the model is down; the service
//! layer falls back to deterministic rules and reports `source`.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::advisor::{Categorization, EventBudget, EventRequest, FestivalRequest};
use crate::api::dto::{
    CategorizeRequest, EventBudgetRequest, FestivalPlanRequest, FestivalPlanResponse,
    InsightsRequest, InsightsResponse, parse_date, parse_optional_bound,
};
use crate::app_state::AppState;
use crate::domain::OwnerId;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::CategorizeInput;

/// `POST /ai/categorize`: Categorize items or an owner's recent transactions.
///
/// # Errors
///
/// Returns [`GatewayError`] if neither items nor an owner are given, or the
/// store fails.
#[utoipa::path(
    post,
    path = "/api/v1/ai/categorize",
    tag = "AI",
    summary = "Categorize transactions",
    description = "Assigns one of Food, Travel, Shopping, Rent, Bills, Entertainment, Medical, Other to every item. Uses the language model when configured and keyword rules otherwise; `source` tells which answered.",
    request_body = CategorizeRequest,
    responses(
        (status = 200, description = "One category per item", body = Categorization),
        (status = 400, description = "Neither items nor ownerId given", body = ErrorResponse),
    )
)]
pub async fn categorize(
    State(state): State<AppState>,
    Json(req): Json<CategorizeRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let input = match (req.items, req.owner_id) {
        (Some(items), _) if !items.is_empty() => CategorizeInput::Items(items),
        (_, Some(owner)) => CategorizeInput::Recent {
            owner: OwnerId::parse(&owner)?,
            limit: req.limit,
        },
        (Some(_), None) => CategorizeInput::Items(Vec::new()),
        (None, None) => {
            return Err(GatewayError::InvalidRequest(
                "items or ownerId required".to_string(),
            ));
        }
    };

    let out = state.insights.categorize(input).await?;
    Ok(Json(out))
}

/// `POST /ai/insights`: Spending summary and advice.
///
/// # Errors
///
/// Returns [`GatewayError`] on a blank owner, malformed dates, or a store
/// failure.
#[utoipa::path(
    post,
    path = "/api/v1/ai/insights",
    tag = "AI",
    summary = "Spending insights",
    description = "Totals the owner's expenses per category in the window and returns three problems, three tips, one micro-action and an explanation.",
    request_body = InsightsRequest,
    responses(
        (status = 200, description = "Advice and summary", body = InsightsResponse),
        (status = 400, description = "Invalid owner or dates", body = ErrorResponse),
    )
)]
pub async fn insights(
    State(state): State<AppState>,
    Json(req): Json<InsightsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let owner = OwnerId::parse(&req.owner_id)?;
    let from = parse_optional_bound(req.from.as_deref(), "from", false)?;
    let to = parse_optional_bound(req.to.as_deref(), "to", true)?;

    let out = state
        .insights
        .insights(&owner, from, to, req.sample_limit)
        .await?;
    Ok(Json(InsightsResponse::from(out)))
}

/// `POST /ai/festival`: Weekly savings plan for a festival.
///
/// # Errors
///
/// Returns [`GatewayError`] on a missing or malformed date, a negative
/// budget, or a festival too far away.
#[utoipa::path(
    post,
    path = "/api/v1/ai/festival",
    tag = "AI",
    summary = "Festival savings plan",
    description = "Splits the desired budget into weekly savings targets from the start date (default today) to the festival.",
    request_body = FestivalPlanRequest,
    responses(
        (status = 200, description = "Savings plan", body = FestivalPlanResponse),
        (status = 400, description = "Invalid dates or budget", body = ErrorResponse),
    )
)]
pub async fn festival_plan(
    State(state): State<AppState>,
    Json(req): Json<FestivalPlanRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    if req.festival_date.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "festivalDate required".to_string(),
        ));
    }
    let festival_date = parse_date(&req.festival_date, "festivalDate")?;
    let start_date = match req.start_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_date(raw, "startDate")?,
        _ => Utc::now().date_naive(),
    };
    let request = FestivalRequest::new(festival_date, start_date, req.incomes, req.desired_budget)?;

    let (plan, source) = state.insights.festival_plan(&request).await;
    Ok(Json(FestivalPlanResponse { plan, source }))
}

/// `POST /ai/event`: Split an event budget across priorities.
///
/// # Errors
///
/// Returns [`GatewayError`] for a negative budget.
#[utoipa::path(
    post,
    path = "/api/v1/ai/event",
    tag = "AI",
    summary = "Event budget split",
    description = "Allocates the budget across priorities (Food 40%, Venue 30%, Gifts 20%, Misc 10%; unknown priorities share equally). Rounding leftovers go to the last priority.",
    request_body = EventBudgetRequest,
    responses(
        (status = 200, description = "Budget per priority", body = EventBudget),
        (status = 400, description = "Negative budget", body = ErrorResponse),
    )
)]
pub async fn event_budget(
    State(state): State<AppState>,
    Json(req): Json<EventBudgetRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let request = EventRequest::new(
        req.event_name,
        req.attendees_count,
        req.desired_budget,
        req.priorities,
    )?;
    Ok(Json(state.insights.event_budget(&request)))
}

/// Advisory routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ai/categorize", post(categorize))
        .route("/ai/insights", post(insights))
        .route("/ai/festival", post(festival_plan))
        .route("/ai/event", post(event_budget))
}
