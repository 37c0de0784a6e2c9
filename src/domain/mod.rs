//! Domain layer: identifiers, transactions, rewards, and the pure
//! decision functions of the reward engine.
//!
//! Everything here is free of I/O. The tier classifier, budget estimator,
//! period resolution, and keyword categorizer are plain functions that
//! the service layer composes with the stores.

pub mod budget;
pub mod category;
pub mod ids;
pub mod period;
pub mod reward;
pub mod tier;
pub mod transaction;

pub use category::Category;
pub use ids::{IssuedRewardId, OwnerId, RewardId, TransactionId};
pub use period::Period;
pub use reward::{IssuedReward, RewardDefinition, RewardStatus, Tier, ValueType};
pub use transaction::{Transaction, TransactionFilter, TransactionKind};
