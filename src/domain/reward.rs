//! Reward catalog entries and issued rewards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{IssuedRewardId, OwnerId, RewardId};
use crate::error::GatewayError;

/// Validity applied when a definition does not carry its own.
pub const DEFAULT_VALIDITY_DAYS: u32 = 30;

/// Qualification level earned through spending discipline.
///
/// Ordered best first: `Gold < Silver < Bronze`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Spent at most half of the budget.
    Gold,
    /// Spent at most 65% of the budget.
    Silver,
    /// Spent at most 85% of the budget.
    Bronze,
}

impl Tier {
    /// All tiers, best first.
    pub const ALL: [Self; 3] = [Self::Gold, Self::Silver, Self::Bronze];

    /// Returns the storage discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::Bronze => "bronze",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gold" => Ok(Self::Gold),
            "silver" => Ok(Self::Silver),
            "bronze" => Ok(Self::Bronze),
            other => Err(GatewayError::InvalidRequest(format!("invalid tier: {other}"))),
        }
    }
}

/// How a reward's `value` is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Fixed amount off.
    Flat,
    /// Percentage off.
    Percent,
}

impl ValueType {
    /// Returns the storage discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Percent => "percent",
        }
    }
}

impl FromStr for ValueType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "percent" => Ok(Self::Percent),
            other => Err(GatewayError::InvalidRequest(format!(
                "invalid value type: {other}"
            ))),
        }
    }
}

/// A catalog entry: the coupon handed out for reaching a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardDefinition {
    /// Catalog identifier.
    pub id: RewardId,
    /// Tier this reward is granted for.
    pub tier: Tier,
    /// Unique human-facing code (e.g. `FOOD50`).
    pub code: String,
    /// Short title.
    pub title: String,
    /// Longer description with terms.
    pub description: String,
    /// Flat or percentage value.
    pub value_type: ValueType,
    /// Numeric value, interpreted per `value_type`.
    #[schema(value_type = f64)]
    pub value: Decimal,
    /// Minimum order value the coupon applies to.
    #[schema(value_type = f64)]
    pub min_spend: Decimal,
    /// Days an issuance stays valid.
    pub validity_days: u32,
    /// Partner merchant, if any.
    pub partner_name: Option<String>,
}

impl RewardDefinition {
    /// Computes the expiry of an issuance made at `issued_at`.
    ///
    /// A zero `validity_days` falls back to [`DEFAULT_VALIDITY_DAYS`].
    #[must_use]
    pub fn expiry_from(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        let days = if self.validity_days == 0 {
            DEFAULT_VALIDITY_DAYS
        } else {
            self.validity_days
        };
        issued_at + Duration::days(i64::from(days))
    }
}

/// Lifecycle state of an issued reward.
///
/// `Active` → `Used` on redemption, `Active` → `Expired` once
/// `expires_at` passes. Both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    /// Issued and redeemable.
    Active,
    /// Redeemed.
    Used,
    /// Validity window elapsed before redemption.
    Expired,
}

impl RewardStatus {
    /// Returns the storage discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "expired" => Ok(Self::Expired),
            other => Err(GatewayError::Internal(format!(
                "unknown reward status in store: {other}"
            ))),
        }
    }
}

/// One issuance of a reward to an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedReward {
    /// Issuance identifier.
    pub id: IssuedRewardId,
    /// Owner the reward was issued to.
    pub owner_id: OwnerId,
    /// Catalog entry this issuance refers to.
    pub reward_id: RewardId,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: RewardStatus,
}

impl IssuedReward {
    /// Creates a fresh active issuance of `reward` for `owner_id`.
    #[must_use]
    pub fn issue(owner_id: OwnerId, reward: &RewardDefinition, now: DateTime<Utc>) -> Self {
        Self {
            id: IssuedRewardId::new(),
            owner_id,
            reward_id: reward.id,
            issued_at: now,
            expires_at: reward.expiry_from(now),
            status: RewardStatus::Active,
        }
    }

    /// Returns `true` if the record is still flagged active but its
    /// validity window has passed at `now`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == RewardStatus::Active && self.expires_at <= now
    }
}
