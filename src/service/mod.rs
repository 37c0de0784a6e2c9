//! Service layer: business logic orchestration.
//!
//! [`RewardService`] is the reward engine. [`InsightService`] fronts the
//! advisory capabilities and [`TransactionService`] reads and records
//! money movements. All three hold their stores as `Arc<dyn …>` so tests
//! can swap in the in-memory backend or a failing fake.

pub mod insight_service;
pub mod reward_service;
pub mod transaction_service;

pub use insight_service::{CategorizeInput, InsightService, Insights};
pub use reward_service::{Decision, Evaluation, RewardService, RewardView};
pub use transaction_service::{NewTransaction, TransactionService};
