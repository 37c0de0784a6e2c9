//! PostgreSQL implementation of the store traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{IssuedRewardRow, RewardDefinitionRow, TransactionRow};
use super::{InsertOutcome, RewardCatalog, RewardLedger, TransactionStore};
use crate::config::GatewayConfig;
use crate::domain::{
    IssuedReward, IssuedRewardId, OwnerId, RewardDefinition, RewardId, RewardStatus, Tier,
    Transaction, TransactionFilter,
};
use crate::error::GatewayError;

const TRANSACTION_COLUMNS: &str =
    "id, owner_id, amount, kind, category, description, occurred_at, source";
const DEFINITION_COLUMNS: &str = "id, tier, code, title, description, value_type, value, \
     min_spend, validity_days, partner_name";
const ISSUED_COLUMNS: &str = "id, owner_id, reward_id, issued_at, expires_at, status";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the gateway configuration and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(format!("migration failed: {e}")))?;

        tracing::info!("postgres store ready");
        Ok(Self::new(pool))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl TransactionStore for PostgresStore {
    async fn find(
        &self,
        owner: &OwnerId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, GatewayError> {
        let limit = filter
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE owner_id = $1 \
               AND ($2::text IS NULL OR kind = $2) \
               AND ($3::timestamptz IS NULL OR occurred_at >= $3) \
               AND ($4::timestamptz IS NULL OR occurred_at <= $4) \
             ORDER BY occurred_at DESC \
             LIMIT $5"
        ))
        .bind(owner.as_str())
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn insert_many(&self, txs: &[Transaction]) -> Result<(), GatewayError> {
        let mut db_tx = self.pool.begin().await?;
        for tx in txs {
            sqlx::query(
                "INSERT INTO transactions \
                 (id, owner_id, amount, kind, category, description, occurred_at, source) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(tx.id.as_uuid())
            .bind(tx.owner_id.as_str())
            .bind(tx.amount)
            .bind(tx.kind.as_str())
            .bind(tx.category.as_deref())
            .bind(&tx.description)
            .bind(tx.occurred_at)
            .bind(tx.source.as_deref())
            .execute(&mut *db_tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    GatewayError::InvalidRequest(format!("transaction {} already exists", tx.id))
                } else {
                    e.into()
                }
            })?;
        }
        db_tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RewardCatalog for PostgresStore {
    async fn list(&self) -> Result<Vec<RewardDefinition>, GatewayError> {
        let rows = sqlx::query_as::<_, RewardDefinitionRow>(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM reward_definitions \
             ORDER BY CASE tier WHEN 'gold' THEN 0 WHEN 'silver' THEN 1 ELSE 2 END"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RewardDefinition::try_from).collect()
    }

    async fn find_by_tier(&self, tier: Tier) -> Result<Option<RewardDefinition>, GatewayError> {
        let row = sqlx::query_as::<_, RewardDefinitionRow>(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM reward_definitions WHERE tier = $1"
        ))
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RewardDefinition::try_from).transpose()
    }

    async fn insert(&self, definition: &RewardDefinition) -> Result<(), GatewayError> {
        let validity_days = i32::try_from(definition.validity_days).map_err(|_| {
            GatewayError::InvalidRequest(format!(
                "validity_days too large: {}",
                definition.validity_days
            ))
        })?;

        sqlx::query(
            "INSERT INTO reward_definitions \
             (id, tier, code, title, description, value_type, value, min_spend, validity_days, partner_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(definition.id.as_uuid())
        .bind(definition.tier.as_str())
        .bind(&definition.code)
        .bind(&definition.title)
        .bind(&definition.description)
        .bind(definition.value_type.as_str())
        .bind(definition.value)
        .bind(definition.min_spend)
        .bind(validity_days)
        .bind(definition.partner_name.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatewayError::InvalidRequest(format!(
                    "reward {} conflicts with an existing {} definition",
                    definition.code, definition.tier
                ))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }
}

#[async_trait]
impl RewardLedger for PostgresStore {
    async fn find_active(
        &self,
        owner: &OwnerId,
        reward_id: RewardId,
    ) -> Result<Option<IssuedReward>, GatewayError> {
        let row = sqlx::query_as::<_, IssuedRewardRow>(&format!(
            "SELECT {ISSUED_COLUMNS} FROM issued_rewards \
             WHERE owner_id = $1 AND reward_id = $2 AND status = 'active'"
        ))
        .bind(owner.as_str())
        .bind(reward_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(IssuedReward::try_from).transpose()
    }

    async fn insert_active(&self, issued: &IssuedReward) -> Result<InsertOutcome, GatewayError> {
        let result = sqlx::query(
            "INSERT INTO issued_rewards (id, owner_id, reward_id, issued_at, expires_at, status) \
             VALUES ($1, $2, $3, $4, $5, 'active')",
        )
        .bind(issued.id.as_uuid())
        .bind(issued.owner_id.as_str())
        .bind(issued.reward_id.as_uuid())
        .bind(issued.issued_at)
        .bind(issued.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted(issued.clone())),
            // Lost the race against a concurrent issuance: the partial
            // unique index rejected us, so report the winner.
            Err(e) if is_unique_violation(&e) => {
                match self.find_active(&issued.owner_id, issued.reward_id).await? {
                    Some(existing) => Ok(InsertOutcome::AlreadyActive(existing)),
                    None => Err(GatewayError::PersistenceError(
                        "active issuance changed concurrently; retry".to_string(),
                    )),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(
        &self,
        id: IssuedRewardId,
        owner: &OwnerId,
    ) -> Result<Option<IssuedReward>, GatewayError> {
        let row = sqlx::query_as::<_, IssuedRewardRow>(&format!(
            "SELECT {ISSUED_COLUMNS} FROM issued_rewards WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(IssuedReward::try_from).transpose()
    }

    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<IssuedReward>, GatewayError> {
        let rows = sqlx::query_as::<_, IssuedRewardRow>(&format!(
            "SELECT {ISSUED_COLUMNS} FROM issued_rewards \
             WHERE owner_id = $1 ORDER BY issued_at DESC"
        ))
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(IssuedReward::try_from).collect()
    }

    async fn transition(
        &self,
        id: IssuedRewardId,
        owner: &OwnerId,
        from: RewardStatus,
        to: RewardStatus,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE issued_rewards SET status = $4, updated_at = now() \
             WHERE id = $1 AND owner_id = $2 AND status = $3",
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_overdue(
        &self,
        owner: &OwnerId,
        now: DateTime<Utc>,
    ) -> Result<u64, GatewayError> {
        let result = sqlx::query(
            "UPDATE issued_rewards SET status = 'expired', updated_at = now() \
             WHERE owner_id = $1 AND status = 'active' AND expires_at <= $2",
        )
        .bind(owner.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
