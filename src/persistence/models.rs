//! Database row models and their conversion into domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    IssuedReward, OwnerId, RewardDefinition, RewardStatus, Tier, Transaction, TransactionKind,
    ValueType,
};
use crate::error::GatewayError;

/// A row from the `transactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    /// Primary key.
    pub id: Uuid,
    /// Owner identity.
    pub owner_id: String,
    /// Non-negative magnitude (`NUMERIC`).
    pub amount: Decimal,
    /// `income` or `expense`.
    pub kind: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Statement description.
    pub description: String,
    /// Movement timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Optional origin label.
    pub source: Option<String>,
}

/// A row from the `reward_definitions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RewardDefinitionRow {
    /// Primary key.
    pub id: Uuid,
    /// `gold`, `silver` or `bronze`; unique.
    pub tier: String,
    /// Unique coupon code.
    pub code: String,
    /// Short title.
    pub title: String,
    /// Terms.
    pub description: String,
    /// `flat` or `percent`.
    pub value_type: String,
    /// Coupon value.
    pub value: Decimal,
    /// Minimum order value.
    pub min_spend: Decimal,
    /// Validity in days.
    pub validity_days: i32,
    /// Partner merchant.
    pub partner_name: Option<String>,
}

/// A row from the `issued_rewards` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssuedRewardRow {
    /// Primary key.
    pub id: Uuid,
    /// Owner identity.
    pub owner_id: String,
    /// Referenced catalog entry.
    pub reward_id: Uuid,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// `active`, `used` or `expired`.
    pub status: String,
}

fn corrupt(what: &str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::PersistenceError(format!("corrupt {what} row: {err}"))
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = GatewayError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            owner_id: OwnerId::parse(&row.owner_id).map_err(|e| corrupt("transaction", e))?,
            amount: row.amount,
            kind: row
                .kind
                .parse::<TransactionKind>()
                .map_err(|e| corrupt("transaction", e))?,
            category: row.category,
            description: row.description,
            occurred_at: row.occurred_at,
            source: row.source,
        })
    }
}

impl TryFrom<RewardDefinitionRow> for RewardDefinition {
    type Error = GatewayError;

    fn try_from(row: RewardDefinitionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            tier: row
                .tier
                .parse::<Tier>()
                .map_err(|e| corrupt("reward definition", e))?,
            code: row.code,
            title: row.title,
            description: row.description,
            value_type: row
                .value_type
                .parse::<ValueType>()
                .map_err(|e| corrupt("reward definition", e))?,
            value: row.value,
            min_spend: row.min_spend,
            validity_days: u32::try_from(row.validity_days)
                .map_err(|e| corrupt("reward definition", e))?,
            partner_name: row.partner_name,
        })
    }
}

impl TryFrom<IssuedRewardRow> for IssuedReward {
    type Error = GatewayError;

    fn try_from(row: IssuedRewardRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            owner_id: OwnerId::parse(&row.owner_id).map_err(|e| corrupt("issued reward", e))?,
            reward_id: row.reward_id.into(),
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            status: row
                .status
                .parse::<RewardStatus>()
                .map_err(|e| corrupt("issued reward", e))?,
        })
    }
}
