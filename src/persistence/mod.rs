//! Persistence layer: store contracts and their implementations.
//!
//! The reward engine only talks to the three traits below. Two backends
//! implement all of them:
//!
//! - [`memory::InMemoryStore`] keeps everything in `RwLock`-guarded maps.
//!   Used for tests and when `PERSISTENCE_ENABLED=false`.
//! - [`postgres::PostgresStore`] uses `sqlx::PgPool`; the schema lives in
//!   `migrations/`.
//!
//! # Ledger uniqueness
//!
//! At most one `active` issuance may exist per `(owner, reward)` pair.
//! Backends enforce this on insert, not by a separate read, so two
//! concurrent evaluations cannot both issue. A losing insert reports
//! [`InsertOutcome::AlreadyActive`] with the winner's record.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    IssuedReward, IssuedRewardId, OwnerId, RewardDefinition, RewardId, RewardStatus, Tier,
    Transaction, TransactionFilter,
};
use crate::error::GatewayError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Result of inserting an active issuance into the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The record was stored as given.
    Inserted(IssuedReward),
    /// Another active issuance for the same owner and reward already
    /// exists; nothing was written.
    AlreadyActive(IssuedReward),
}

/// Read access to recorded transactions, plus bulk recording.
#[async_trait]
pub trait TransactionStore: Send + Sync + Debug {
    /// Returns the owner's transactions matching `filter`, newest first.
    async fn find(
        &self,
        owner: &OwnerId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, GatewayError>;

    /// Records transactions. All or nothing.
    async fn insert_many(&self, txs: &[Transaction]) -> Result<(), GatewayError>;
}

/// The reward catalog.
#[async_trait]
pub trait RewardCatalog: Send + Sync + Debug {
    /// Returns every definition, ordered by tier (best first).
    async fn list(&self) -> Result<Vec<RewardDefinition>, GatewayError>;

    /// Returns the definition configured for `tier`, if any.
    async fn find_by_tier(&self, tier: Tier) -> Result<Option<RewardDefinition>, GatewayError>;

    /// Adds a definition.
    ///
    /// Fails with [`GatewayError::InvalidRequest`] if the tier or code is
    /// already taken.
    async fn insert(&self, definition: &RewardDefinition) -> Result<(), GatewayError>;
}

/// The issued-reward ledger.
#[async_trait]
pub trait RewardLedger: Send + Sync + Debug {
    /// Returns the owner's active issuance of `reward_id`, if any.
    async fn find_active(
        &self,
        owner: &OwnerId,
        reward_id: RewardId,
    ) -> Result<Option<IssuedReward>, GatewayError>;

    /// Inserts an active issuance unless one already exists for the same
    /// owner and reward.
    async fn insert_active(&self, issued: &IssuedReward) -> Result<InsertOutcome, GatewayError>;

    /// Loads an issuance scoped to its owner.
    async fn get(
        &self,
        id: IssuedRewardId,
        owner: &OwnerId,
    ) -> Result<Option<IssuedReward>, GatewayError>;

    /// Returns all of the owner's issuances, most recently issued first.
    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<IssuedReward>, GatewayError>;

    /// Moves an issuance from `from` to `to` if it is still in `from`.
    ///
    /// Returns `false` when the record is missing or its status changed
    /// in the meantime.
    async fn transition(
        &self,
        id: IssuedRewardId,
        owner: &OwnerId,
        from: RewardStatus,
        to: RewardStatus,
    ) -> Result<bool, GatewayError>;

    /// Marks the owner's active issuances with `expires_at <= now` as
    /// expired and returns how many changed.
    async fn expire_overdue(&self, owner: &OwnerId, now: DateTime<Utc>)
    -> Result<u64, GatewayError>;
}
