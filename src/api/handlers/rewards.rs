//! Reward handlers: evaluate, list, redeem.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    EvaluateRewardRequest, EvaluateRewardResponse, IssuedRewardDto, RedeemRequest, RedeemResponse,
};
use crate::app_state::AppState;
use crate::domain::{IssuedRewardId, OwnerId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /rewards/evaluate`: Evaluate the month and issue the tier's coupon.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid input or a store failure.
#[utoipa::path(
    post,
    path = "/api/v1/rewards/evaluate",
    tag = "Rewards",
    summary = "Evaluate and issue a reward",
    description = "Sums the owner's expenses for the month, compares them to the stated or estimated budget, and issues the matching tier's coupon unless one is already active. Repeated calls return the same active coupon.",
    request_body = EvaluateRewardRequest,
    responses(
        (status = 200, description = "Evaluation result", body = EvaluateRewardResponse),
        (status = 400, description = "Missing owner, bad month or negative budget", body = ErrorResponse),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn evaluate_reward(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRewardRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let owner = OwnerId::parse(&req.owner_id)?;
    let month = req.month.as_ref().map(|m| m.value("month")).transpose()?;
    let year = req
        .year
        .as_ref()
        .map(|y| {
            y.value("year").and_then(|y| {
                i32::try_from(y).map_err(|_| GatewayError::InvalidRequest("year out of range".into()))
            })
        })
        .transpose()?;

    let evaluation = state
        .rewards
        .evaluate_and_issue(&owner, year, month, req.monthly_budget)
        .await?;

    Ok(Json(EvaluateRewardResponse::from(evaluation)))
}

/// `GET /rewards/user/{ownerId}`: List the owner's coupons.
///
/// # Errors
///
/// Returns [`GatewayError`] on a blank owner or a store failure.
#[utoipa::path(
    get,
    path = "/api/v1/rewards/user/{owner_id}",
    tag = "Rewards",
    summary = "List issued rewards",
    description = "Returns every coupon issued to the owner, most recently issued first. Active coupons past their expiry are reported as expired.",
    params(("owner_id" = String, Path, description = "Owner identifier")),
    responses(
        (status = 200, description = "Issued rewards", body = Vec<IssuedRewardDto>),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn list_rewards(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let owner = OwnerId::parse(&owner_id)?;
    let views = state.rewards.list_rewards(&owner).await?;
    let body: Vec<IssuedRewardDto> = views.into_iter().map(IssuedRewardDto::from).collect();
    Ok(Json(body))
}

/// `POST /rewards/redeem`: Mark an active coupon as used.
///
/// # Errors
///
/// Returns [`GatewayError`] if the coupon is unknown, not the owner's, or
/// no longer active.
#[utoipa::path(
    post,
    path = "/api/v1/rewards/redeem",
    tag = "Rewards",
    summary = "Redeem a reward",
    description = "Transitions the owner's active coupon to used. Redemption is one-way.",
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Coupon redeemed", body = RedeemResponse),
        (status = 400, description = "Missing or malformed ids", body = ErrorResponse),
        (status = 404, description = "No such coupon for this owner", body = ErrorResponse),
        (status = 409, description = "Coupon is not active", body = ErrorResponse),
    )
)]
pub async fn redeem_reward(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let owner = OwnerId::parse(&req.owner_id)?;
    let id = req
        .issued_reward_id
        .trim()
        .parse::<uuid::Uuid>()
        .map(IssuedRewardId::from_uuid)
        .map_err(|_| GatewayError::InvalidRequest("issuedRewardId must be a UUID".to_string()))?;

    let redeemed = state.rewards.redeem(&owner, id).await?;

    Ok(Json(RedeemResponse {
        ok: true,
        issued_reward_id: redeemed.id,
        status: redeemed.status,
    }))
}

/// Reward routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rewards/evaluate", post(evaluate_reward))
        .route("/rewards/user/{owner_id}", get(list_rewards))
        .route("/rewards/redeem", post(redeem_reward))
}
