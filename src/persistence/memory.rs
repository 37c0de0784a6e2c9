//! In-memory implementation of every store trait.
//!
//! Each collection sits behind its own [`tokio::sync::RwLock`]. Ledger
//! writes take the ledger's write lock for the whole check-and-insert,
//! which makes the active-uniqueness rule atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{InsertOutcome, RewardCatalog, RewardLedger, TransactionStore};
use crate::domain::{
    IssuedReward, IssuedRewardId, OwnerId, RewardDefinition, RewardId, RewardStatus, Tier,
    Transaction, TransactionFilter, TransactionId,
};
use crate::error::GatewayError;

/// Process-local store for transactions, catalog, and ledger.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
    catalog: RwLock<Vec<RewardDefinition>>,
    ledger: RwLock<HashMap<IssuedRewardId, IssuedReward>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of ledger records with the given status.
    pub async fn count_with_status(&self, status: RewardStatus) -> usize {
        self.ledger
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .count()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn find(
        &self,
        owner: &OwnerId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, GatewayError> {
        let map = self.transactions.read().await;
        let mut rows: Vec<Transaction> = map
            .values()
            .filter(|tx| &tx.owner_id == owner && filter.matches(tx))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert_many(&self, txs: &[Transaction]) -> Result<(), GatewayError> {
        let mut map = self.transactions.write().await;
        if let Some(dup) = txs.iter().find(|tx| map.contains_key(&tx.id)) {
            return Err(GatewayError::InvalidRequest(format!(
                "transaction {} already exists",
                dup.id
            )));
        }
        for tx in txs {
            map.insert(tx.id, tx.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl RewardCatalog for InMemoryStore {
    async fn list(&self) -> Result<Vec<RewardDefinition>, GatewayError> {
        let mut rows = self.catalog.read().await.clone();
        rows.sort_by_key(|d| d.tier);
        Ok(rows)
    }

    async fn find_by_tier(&self, tier: Tier) -> Result<Option<RewardDefinition>, GatewayError> {
        Ok(self
            .catalog
            .read()
            .await
            .iter()
            .find(|d| d.tier == tier)
            .cloned())
    }

    async fn insert(&self, definition: &RewardDefinition) -> Result<(), GatewayError> {
        let mut catalog = self.catalog.write().await;
        if catalog
            .iter()
            .any(|d| d.tier == definition.tier || d.code == definition.code || d.id == definition.id)
        {
            return Err(GatewayError::InvalidRequest(format!(
                "reward {} conflicts with an existing {} definition",
                definition.code, definition.tier
            )));
        }
        catalog.push(definition.clone());
        Ok(())
    }
}

#[async_trait]
impl RewardLedger for InMemoryStore {
    async fn find_active(
        &self,
        owner: &OwnerId,
        reward_id: RewardId,
    ) -> Result<Option<IssuedReward>, GatewayError> {
        Ok(self
            .ledger
            .read()
            .await
            .values()
            .find(|r| {
                &r.owner_id == owner && r.reward_id == reward_id && r.status == RewardStatus::Active
            })
            .cloned())
    }

    async fn insert_active(&self, issued: &IssuedReward) -> Result<InsertOutcome, GatewayError> {
        let mut ledger = self.ledger.write().await;
        if let Some(existing) = ledger.values().find(|r| {
            r.owner_id == issued.owner_id
                && r.reward_id == issued.reward_id
                && r.status == RewardStatus::Active
        }) {
            return Ok(InsertOutcome::AlreadyActive(existing.clone()));
        }
        if ledger.contains_key(&issued.id) {
            return Err(GatewayError::Internal(format!(
                "issued reward {} already exists",
                issued.id
            )));
        }
        ledger.insert(issued.id, issued.clone());
        Ok(InsertOutcome::Inserted(issued.clone()))
    }

    async fn get(
        &self,
        id: IssuedRewardId,
        owner: &OwnerId,
    ) -> Result<Option<IssuedReward>, GatewayError> {
        Ok(self
            .ledger
            .read()
            .await
            .get(&id)
            .filter(|r| &r.owner_id == owner)
            .cloned())
    }

    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<IssuedReward>, GatewayError> {
        let ledger = self.ledger.read().await;
        let mut rows: Vec<IssuedReward> = ledger
            .values()
            .filter(|r| &r.owner_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(rows)
    }

    async fn transition(
        &self,
        id: IssuedRewardId,
        owner: &OwnerId,
        from: RewardStatus,
        to: RewardStatus,
    ) -> Result<bool, GatewayError> {
        let mut ledger = self.ledger.write().await;
        match ledger.get_mut(&id) {
            Some(record) if &record.owner_id == owner && record.status == from => {
                record.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_overdue(
        &self,
        owner: &OwnerId,
        now: DateTime<Utc>,
    ) -> Result<u64, GatewayError> {
        let mut ledger = self.ledger.write().await;
        let mut changed = 0;
        for record in ledger.values_mut() {
            if &record.owner_id == owner && record.is_overdue(now) {
                record.status = RewardStatus::Expired;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
