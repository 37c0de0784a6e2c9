//! Reward DTOs for evaluate, list and redeem.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::IntegerInput;
use crate::domain::{IssuedRewardId, RewardDefinition, RewardStatus, Tier, ValueType};
use crate::service::{Decision, Evaluation, RewardView};

/// Request body for `POST /rewards/evaluate`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRewardRequest {
    /// Owner to evaluate.
    #[serde(default)]
    pub owner_id: String,
    /// Month, `1..=12` (or `0` for January). Defaults to the current month.
    #[serde(default)]
    pub month: Option<IntegerInput>,
    /// Year. Defaults to the current year.
    #[serde(default)]
    pub year: Option<IntegerInput>,
    /// Explicit monthly budget; absent or zero means estimate from income.
    #[serde(default)]
    pub monthly_budget: Option<Decimal>,
}

/// Coupon details embedded in an evaluation response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponDto {
    /// Coupon code.
    pub code: String,
    /// Title.
    pub title: String,
    /// Terms.
    pub description: String,
    /// Flat or percent.
    pub value_type: ValueType,
    /// Value.
    pub value: Decimal,
    /// Minimum order value.
    pub min_spend: Decimal,
    /// Partner merchant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,
    /// Expiry of the owner's issuance.
    pub expires_at: DateTime<Utc>,
}

impl CouponDto {
    fn new(reward: RewardDefinition, expires_at: DateTime<Utc>) -> Self {
        Self {
            code: reward.code,
            title: reward.title,
            description: reward.description,
            value_type: reward.value_type,
            value: reward.value,
            min_spend: reward.min_spend,
            partner_name: reward.partner_name,
            expires_at,
        }
    }
}

/// How an evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// No tier reached.
    NotEligible,
    /// Tier reached, nothing in the catalog.
    Unconfigured,
    /// Existing active issuance returned.
    AlreadyActive,
    /// New issuance recorded.
    Issued,
}

/// Response body for `POST /rewards/evaluate`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRewardResponse {
    /// Whether a tier was reached.
    pub eligible: bool,
    /// Outcome discriminator.
    pub outcome: EvaluationOutcome,
    /// Tier reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    /// Coupon handed out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponDto>,
    /// Issued reward id, for redemption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_coupon_id: Option<IssuedRewardId>,
    /// Evaluated year.
    pub year: i32,
    /// Evaluated month, `1..=12`.
    pub month: u32,
    /// Sum of expenses in the month.
    pub total_expense: Decimal,
    /// Budget used for the ratio.
    pub monthly_budget: Option<Decimal>,
    /// Why the owner is not eligible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Informational message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Evaluation> for EvaluateRewardResponse {
    fn from(evaluation: Evaluation) -> Self {
        let mut response = Self {
            eligible: true,
            outcome: EvaluationOutcome::NotEligible,
            tier: evaluation.tier(),
            coupon: None,
            user_coupon_id: None,
            year: evaluation.period.year(),
            month: evaluation.period.month0() + 1,
            total_expense: evaluation.total_expense,
            monthly_budget: evaluation.monthly_budget,
            reason: None,
            message: None,
        };
        match evaluation.decision {
            Decision::NotEligible => {
                response.eligible = false;
                response.reason = Some("Not within reward thresholds".to_string());
            }
            Decision::Unconfigured { .. } => {
                response.outcome = EvaluationOutcome::Unconfigured;
                response.message =
                    Some("Qualified but no coupon configured for this tier".to_string());
            }
            Decision::AlreadyActive { reward, issued, .. } => {
                response.outcome = EvaluationOutcome::AlreadyActive;
                response.coupon = Some(CouponDto::new(reward, issued.expires_at));
                response.user_coupon_id = Some(issued.id);
                response.message = Some("Coupon already unlocked and active".to_string());
            }
            Decision::Issued { reward, issued, .. } => {
                response.outcome = EvaluationOutcome::Issued;
                response.coupon = Some(CouponDto::new(reward, issued.expires_at));
                response.user_coupon_id = Some(issued.id);
            }
        }
        response
    }
}

/// One entry of `GET /rewards/user/{ownerId}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedRewardDto {
    /// Issued reward id.
    pub id: IssuedRewardId,
    /// Catalog entry, if still present.
    pub reward: Option<RewardDefinition>,
    /// Lifecycle state.
    pub status: RewardStatus,
    /// Issuance time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl From<RewardView> for IssuedRewardDto {
    fn from(view: RewardView) -> Self {
        Self {
            id: view.issued.id,
            reward: view.reward,
            status: view.issued.status,
            issued_at: view.issued.issued_at,
            expires_at: view.issued.expires_at,
        }
    }
}

/// Request body for `POST /rewards/redeem`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    /// Owner redeeming.
    #[serde(default)]
    pub owner_id: String,
    /// Issued reward to redeem.
    #[serde(default, alias = "userCouponId")]
    pub issued_reward_id: String,
}

/// Response body for `POST /rewards/redeem`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    /// Always `true`.
    pub ok: bool,
    /// Redeemed reward id.
    pub issued_reward_id: IssuedRewardId,
    /// New status (`used`).
    pub status: RewardStatus,
}
