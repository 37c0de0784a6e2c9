//! Reward service: tier evaluation, issuance and redemption.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::budget::{self, INCOME_FETCH_LIMIT};
use crate::domain::tier::classify;
use crate::domain::transaction::total_expense;
use crate::domain::{
    IssuedReward, IssuedRewardId, OwnerId, Period, RewardDefinition, RewardId, RewardStatus, Tier,
    TransactionFilter, TransactionKind, ValueType,
};
use crate::error::GatewayError;
use crate::persistence::{InsertOutcome, RewardCatalog, RewardLedger, TransactionStore};

/// What an evaluation concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Spending did not reach any tier.
    NotEligible,
    /// A tier was reached but the catalog has nothing for it.
    Unconfigured {
        /// Tier reached.
        tier: Tier,
    },
    /// The owner already holds an active issuance of the tier's reward.
    AlreadyActive {
        /// Tier reached.
        tier: Tier,
        /// Catalog entry.
        reward: RewardDefinition,
        /// The existing issuance, unchanged.
        issued: IssuedReward,
    },
    /// A new issuance was recorded.
    Issued {
        /// Tier reached.
        tier: Tier,
        /// Catalog entry.
        reward: RewardDefinition,
        /// The new issuance.
        issued: IssuedReward,
    },
}

/// Result of evaluating one owner for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Evaluated calendar month.
    pub period: Period,
    /// Sum of expenses within the period.
    pub total_expense: Decimal,
    /// Budget the ratio was computed against, if any.
    pub monthly_budget: Option<Decimal>,
    /// Outcome.
    pub decision: Decision,
}

impl Evaluation {
    /// Tier reached, if any.
    #[must_use]
    pub fn tier(&self) -> Option<Tier> {
        match &self.decision {
            Decision::NotEligible => None,
            Decision::Unconfigured { tier }
            | Decision::AlreadyActive { tier, .. }
            | Decision::Issued { tier, .. } => Some(*tier),
        }
    }
}

/// An issuance joined with its catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardView {
    /// The ledger record.
    pub issued: IssuedReward,
    /// Catalog entry; `None` if it was removed from the catalog.
    pub reward: Option<RewardDefinition>,
}

/// Orchestrates the reward engine over injected stores.
///
/// The only write on the evaluation path is the ledger insert. Everything
/// before it is a read, so a retry after a failed write re-runs the
/// active-record check and cannot double-issue.
#[derive(Debug, Clone)]
pub struct RewardService {
    transactions: Arc<dyn TransactionStore>,
    catalog: Arc<dyn RewardCatalog>,
    ledger: Arc<dyn RewardLedger>,
}

impl RewardService {
    /// Creates a new `RewardService`.
    #[must_use]
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        catalog: Arc<dyn RewardCatalog>,
        ledger: Arc<dyn RewardLedger>,
    ) -> Self {
        Self {
            transactions,
            catalog,
            ledger,
        }
    }

    /// Evaluates `owner` for a period and issues the tier's reward once.
    ///
    /// # Errors
    ///
    /// See [`RewardService::evaluate_at`].
    pub async fn evaluate_and_issue(
        &self,
        owner: &OwnerId,
        year: Option<i32>,
        month: Option<i64>,
        explicit_budget: Option<Decimal>,
    ) -> Result<Evaluation, GatewayError> {
        self.evaluate_at(owner, year, month, explicit_budget, Utc::now())
            .await
    }

    /// [`RewardService::evaluate_and_issue`] with an explicit clock.
    ///
    /// A zero or absent budget is estimated from recent income.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidMonth`] for month input outside `0..=12`.
    /// - [`GatewayError::InvalidRequest`] for a negative budget.
    /// - [`GatewayError::PersistenceError`] if a store call fails.
    pub async fn evaluate_at(
        &self,
        owner: &OwnerId,
        year: Option<i32>,
        month: Option<i64>,
        explicit_budget: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, GatewayError> {
        if explicit_budget.is_some_and(|b| b < Decimal::ZERO) {
            return Err(GatewayError::InvalidRequest(
                "monthlyBudget must not be negative".to_string(),
            ));
        }

        let period = Period::resolve(year, month, now)?;
        let expenses = self
            .transactions
            .find(
                owner,
                &TransactionFilter::of_kind(TransactionKind::Expense)
                    .between(period.start()?, period.end()?),
            )
            .await?;
        let total = total_expense(&expenses)?;

        let monthly_budget = match explicit_budget.filter(|b| *b > Decimal::ZERO) {
            Some(budget) => Some(budget),
            None => {
                let incomes = self
                    .transactions
                    .find(
                        owner,
                        &TransactionFilter::of_kind(TransactionKind::Income)
                            .limited(INCOME_FETCH_LIMIT),
                    )
                    .await?;
                budget::estimate(&incomes)
            }
        };

        let evaluation = |decision| Evaluation {
            period,
            total_expense: total,
            monthly_budget,
            decision,
        };

        let Some(tier) = classify(total, monthly_budget) else {
            tracing::info!(%owner, total_expense = %total, "not eligible");
            return Ok(evaluation(Decision::NotEligible));
        };

        let Some(reward) = self.catalog.find_by_tier(tier).await? else {
            tracing::warn!(%owner, %tier, "tier reached but no reward configured");
            return Ok(evaluation(Decision::Unconfigured { tier }));
        };

        let expired = self.ledger.expire_overdue(owner, now).await?;
        if expired > 0 {
            tracing::debug!(%owner, expired, "marked overdue rewards expired");
        }

        if let Some(existing) = self.ledger.find_active(owner, reward.id).await? {
            tracing::info!(%owner, %tier, issued_reward_id = %existing.id, "reward already active");
            return Ok(evaluation(Decision::AlreadyActive {
                tier,
                reward,
                issued: existing,
            }));
        }

        let candidate = IssuedReward::issue(owner.clone(), &reward, now);
        let decision = match self.ledger.insert_active(&candidate).await? {
            InsertOutcome::Inserted(issued) => {
                tracing::info!(
                    %owner,
                    %tier,
                    issued_reward_id = %issued.id,
                    expires_at = %issued.expires_at,
                    "reward issued"
                );
                Decision::Issued {
                    tier,
                    reward,
                    issued,
                }
            }
            InsertOutcome::AlreadyActive(issued) => Decision::AlreadyActive {
                tier,
                reward,
                issued,
            },
        };
        Ok(evaluation(decision))
    }

    /// Lists the owner's issuances, newest first, joined with the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if a store call fails.
    pub async fn list_rewards(&self, owner: &OwnerId) -> Result<Vec<RewardView>, GatewayError> {
        self.ledger.expire_overdue(owner, Utc::now()).await?;
        let issued = self.ledger.list_for_owner(owner).await?;
        let catalog: HashMap<RewardId, RewardDefinition> = self
            .catalog
            .list()
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        Ok(issued
            .into_iter()
            .map(|issued| RewardView {
                reward: catalog.get(&issued.reward_id).cloned(),
                issued,
            })
            .collect())
    }

    /// Redeems an issuance for its owner.
    ///
    /// # Errors
    ///
    /// See [`RewardService::redeem_at`].
    pub async fn redeem(
        &self,
        owner: &OwnerId,
        id: IssuedRewardId,
    ) -> Result<IssuedReward, GatewayError> {
        self.redeem_at(owner, id, Utc::now()).await
    }

    /// [`RewardService::redeem`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::IssuedRewardNotFound`] if the record does not
    ///   exist for `owner`.
    /// - [`GatewayError::InvalidState`] if it is not active, or its
    ///   validity window has passed.
    /// - [`GatewayError::PersistenceError`] if a store call fails.
    pub async fn redeem_at(
        &self,
        owner: &OwnerId,
        id: IssuedRewardId,
        now: DateTime<Utc>,
    ) -> Result<IssuedReward, GatewayError> {
        let Some(record) = self.ledger.get(id, owner).await? else {
            return Err(GatewayError::IssuedRewardNotFound(*id.as_uuid()));
        };

        if record.is_overdue(now) {
            self.ledger
                .transition(id, owner, RewardStatus::Active, RewardStatus::Expired)
                .await?;
            return Err(GatewayError::InvalidState(format!(
                "reward expired at {}",
                record.expires_at
            )));
        }
        if record.status != RewardStatus::Active {
            return Err(not_active(record.status));
        }

        if !self
            .ledger
            .transition(id, owner, RewardStatus::Active, RewardStatus::Used)
            .await?
        {
            // Lost a race with another redemption or expiry.
            let status = self
                .ledger
                .get(id, owner)
                .await?
                .map_or(RewardStatus::Used, |r| r.status);
            return Err(not_active(status));
        }

        tracing::info!(%owner, issued_reward_id = %id, "reward redeemed");
        Ok(IssuedReward {
            status: RewardStatus::Used,
            ..record
        })
    }

    /// Returns the catalog, best tier first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store fails.
    pub async fn catalog(&self) -> Result<Vec<RewardDefinition>, GatewayError> {
        self.catalog.list().await
    }

    /// Inserts the default definition for each tier that has none.
    ///
    /// Returns how many definitions were added.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store fails.
    pub async fn seed_default_catalog(&self) -> Result<usize, GatewayError> {
        let mut added = 0;
        for definition in default_catalog() {
            if self.catalog.find_by_tier(definition.tier).await?.is_some() {
                continue;
            }
            self.catalog.insert(&definition).await?;
            tracing::info!(tier = %definition.tier, code = %definition.code, "seeded reward");
            added += 1;
        }
        Ok(added)
    }
}

fn not_active(status: RewardStatus) -> GatewayError {
    GatewayError::InvalidState(format!("reward is not active (status: {status})"))
}

/// The built-in catalog, one reward per tier.
#[must_use]
pub fn default_catalog() -> Vec<RewardDefinition> {
    let entry = |tier: Tier,
                 code: &str,
                 title: &str,
                 description: &str,
                 value_type: ValueType,
                 value: i64,
                 min_spend: i64| {
        RewardDefinition {
            id: RewardId::new(),
            tier,
            code: code.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            value_type,
            value: Decimal::from(value),
            min_spend: Decimal::from(min_spend),
            validity_days: 30,
            partner_name: None,
        }
    };
    vec![
        entry(
            Tier::Gold,
            "FOOD50",
            "50 off Food",
            "50 off on food orders above 299",
            ValueType::Flat,
            50,
            299,
        ),
        entry(
            Tier::Silver,
            "MOVIE10",
            "10% off Movie",
            "10% off on movie tickets (max 100)",
            ValueType::Percent,
            10,
            0,
        ),
        entry(
            Tier::Bronze,
            "SHOP100",
            "100 off Shopping",
            "100 off on shopping above 999",
            ValueType::Flat,
            100,
            999,
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Transaction, TransactionId};
    use crate::persistence::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn owner(raw: &str) -> OwnerId {
        let Ok(owner) = OwnerId::parse(raw) else {
            panic!("valid owner");
        };
        owner
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        let chrono::LocalResult::Single(ts) = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0) else {
            panic!("valid timestamp");
        };
        ts
    }

    fn tx(owner: &OwnerId, kind: TransactionKind, amount: i64, when: DateTime<Utc>) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            owner_id: owner.clone(),
            amount: Decimal::from(amount),
            kind,
            category: None,
            description: String::new(),
            occurred_at: when,
            source: None,
        }
    }

    fn service_over(store: &Arc<InMemoryStore>) -> RewardService {
        RewardService::new(
            Arc::<InMemoryStore>::clone(store),
            Arc::<InMemoryStore>::clone(store),
            Arc::<InMemoryStore>::clone(store),
        )
    }

    async fn setup() -> (Arc<InMemoryStore>, RewardService) {
        let store = Arc::new(InMemoryStore::new());
        let service = service_over(&store);
        let Ok(3) = service.seed_default_catalog().await else {
            panic!("seeding should add three rewards");
        };
        (store, service)
    }

    /// Expenses of 4000 in March 2025, incomes averaging 10000.
    async fn gold_owner(store: &InMemoryStore, who: &OwnerId) {
        let txs = vec![
            tx(who, TransactionKind::Expense, 2500, at(2025, 3, 5)),
            tx(who, TransactionKind::Expense, 1500, at(2025, 3, 20)),
            tx(who, TransactionKind::Expense, 9000, at(2025, 4, 1)),
            tx(who, TransactionKind::Income, 9000, at(2025, 1, 1)),
            tx(who, TransactionKind::Income, 10000, at(2025, 2, 1)),
            tx(who, TransactionKind::Income, 11000, at(2025, 3, 1)),
        ];
        let Ok(()) = store.insert_many(&txs).await else {
            panic!("insert transactions");
        };
    }

    #[tokio::test]
    async fn gold_is_issued_once_with_thirty_day_expiry() {
        let (store, service) = setup().await;
        let who = owner("alice");
        gold_owner(&store, &who).await;
        let now = at(2025, 4, 2);

        let Ok(first) = service.evaluate_at(&who, Some(2025), Some(3), None, now).await else {
            panic!("evaluation failed");
        };
        assert_eq!(first.total_expense, Decimal::from(4000));
        assert_eq!(first.monthly_budget, Some(Decimal::from(10000)));
        let Decision::Issued { tier, reward, issued } = &first.decision else {
            panic!("expected a new issuance, got {:?}", first.decision);
        };
        assert_eq!(*tier, Tier::Gold);
        assert_eq!(reward.code, "FOOD50");
        assert_eq!(issued.expires_at - issued.issued_at, Duration::days(30));

        let Ok(second) = service.evaluate_at(&who, Some(2025), Some(3), None, now).await else {
            panic!("evaluation failed");
        };
        let Decision::AlreadyActive { issued: again, .. } = &second.decision else {
            panic!("expected existing issuance, got {:?}", second.decision);
        };
        assert_eq!(again, issued);
        assert_eq!(store.count_with_status(RewardStatus::Active).await, 1);
    }

    #[tokio::test]
    async fn one_and_zero_based_january_agree() {
        let (store, service) = setup().await;
        let who = owner("bob");
        let Ok(()) = store
            .insert_many(&[tx(&who, TransactionKind::Expense, 100, at(2025, 1, 31))])
            .await
        else {
            panic!("insert");
        };
        let now = at(2025, 6, 1);
        let one = service.evaluate_at(&who, Some(2025), Some(1), None, now).await;
        let zero = service.evaluate_at(&who, Some(2025), Some(0), None, now).await;
        let (Ok(one), Ok(zero)) = (one, zero) else {
            panic!("evaluations failed");
        };
        assert_eq!(one.period, zero.period);
        assert_eq!(one.total_expense, Decimal::from(100));
        assert_eq!(zero.total_expense, Decimal::from(100));
    }

    #[tokio::test]
    async fn overspending_is_not_eligible_and_writes_nothing() {
        let (store, service) = setup().await;
        let who = owner("carol");
        let Ok(()) = store
            .insert_many(&[tx(&who, TransactionKind::Expense, 900, at(2025, 3, 3))])
            .await
        else {
            panic!("insert");
        };
        let result = service
            .evaluate_at(&who, Some(2025), Some(3), Some(Decimal::from(1000)), at(2025, 3, 31))
            .await;
        let Ok(evaluation) = result else {
            panic!("evaluation failed");
        };
        assert_eq!(evaluation.decision, Decision::NotEligible);
        assert_eq!(evaluation.monthly_budget, Some(Decimal::from(1000)));
        assert_eq!(store.count_with_status(RewardStatus::Active).await, 0);
    }

    #[tokio::test]
    async fn missing_catalog_entry_is_unconfigured() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_over(&store);
        let result = service
            .evaluate_at(&owner("dave"), Some(2025), Some(3), None, at(2025, 3, 31))
            .await;
        let Ok(evaluation) = result else {
            panic!("evaluation failed");
        };
        assert_eq!(evaluation.decision, Decision::Unconfigured { tier: Tier::Gold });
        assert_eq!(evaluation.monthly_budget, None);
    }

    #[tokio::test]
    async fn negative_budget_and_bad_month_are_rejected() {
        let (_, service) = setup().await;
        let who = owner("erin");
        let now = at(2025, 3, 1);
        assert!(matches!(
            service.evaluate_at(&who, None, None, Some(Decimal::from(-1)), now).await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.evaluate_at(&who, None, Some(13), None, now).await,
            Err(GatewayError::InvalidMonth(13))
        ));
    }

    #[tokio::test]
    async fn redeem_lifecycle() {
        let (store, service) = setup().await;
        let who = owner("alice");
        gold_owner(&store, &who).await;
        let now = at(2025, 4, 2);
        let Ok(Evaluation {
            decision: Decision::Issued { issued, .. },
            ..
        }) = service.evaluate_at(&who, Some(2025), Some(3), None, now).await
        else {
            panic!("expected issuance");
        };

        // another owner cannot see it
        assert!(matches!(
            service.redeem_at(&owner("mallory"), issued.id, now).await,
            Err(GatewayError::IssuedRewardNotFound(_))
        ));

        let Ok(used) = service.redeem_at(&who, issued.id, now).await else {
            panic!("redeem failed");
        };
        assert_eq!(used.status, RewardStatus::Used);

        assert!(matches!(
            service.redeem_at(&who, issued.id, now).await,
            Err(GatewayError::InvalidState(_))
        ));
        assert!(matches!(
            service.redeem_at(&who, IssuedRewardId::new(), now).await,
            Err(GatewayError::IssuedRewardNotFound(_))
        ));

        // redeemed reward no longer blocks a fresh issuance
        let Ok(next) = service.evaluate_at(&who, Some(2025), Some(3), None, now).await else {
            panic!("evaluation failed");
        };
        assert!(matches!(next.decision, Decision::Issued { .. }));
    }

    #[tokio::test]
    async fn overdue_reward_expires_and_is_reissued() {
        let (store, service) = setup().await;
        let who = owner("alice");
        gold_owner(&store, &who).await;
        let issued_on = at(2025, 4, 2);
        let Ok(Evaluation {
            decision: Decision::Issued { issued, .. },
            ..
        }) = service.evaluate_at(&who, Some(2025), Some(3), None, issued_on).await
        else {
            panic!("expected issuance");
        };

        let later = issued_on + Duration::days(31);
        assert!(matches!(
            service.redeem_at(&who, issued.id, later).await,
            Err(GatewayError::InvalidState(_))
        ));
        assert_eq!(store.count_with_status(RewardStatus::Expired).await, 1);

        let Ok(again) = service.evaluate_at(&who, Some(2025), Some(3), None, later).await else {
            panic!("evaluation failed");
        };
        let Decision::Issued { issued: fresh, .. } = again.decision else {
            panic!("expected reissue");
        };
        assert_ne!(fresh.id, issued.id);
    }

    #[tokio::test]
    async fn list_joins_catalog_newest_first() {
        let (store, service) = setup().await;
        let who = owner("alice");
        gold_owner(&store, &who).await;
        let now = at(2025, 4, 2);
        let Ok(Evaluation {
            decision: Decision::Issued { issued, .. },
            ..
        }) = service.evaluate_at(&who, Some(2025), Some(3), None, now).await
        else {
            panic!("expected issuance");
        };
        let Ok(()) = service.redeem_at(&who, issued.id, now).await.map(|_| ()) else {
            panic!("redeem failed");
        };
        let Ok(_) = service
            .evaluate_at(&who, Some(2025), Some(3), None, now + Duration::hours(1))
            .await
        else {
            panic!("evaluation failed");
        };

        let Ok(views) = service.list_rewards(&who).await else {
            panic!("list failed");
        };
        assert_eq!(views.len(), 2);
        let (Some(newest), Some(oldest)) = (views.first(), views.get(1)) else {
            panic!("expected two views");
        };
        assert!(newest.issued.issued_at > oldest.issued.issued_at);
        assert_eq!(oldest.issued.status, RewardStatus::Used);
        assert_eq!(
            newest.reward.as_ref().map(|r| r.code.as_str()),
            Some("FOOD50")
        );
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (_, service) = setup().await;
        assert!(matches!(service.seed_default_catalog().await, Ok(0)));
        let Ok(catalog) = service.catalog().await else {
            panic!("catalog");
        };
        let tiers: Vec<Tier> = catalog.iter().map(|d| d.tier).collect();
        assert_eq!(tiers, Tier::ALL.to_vec());
    }

    /// Ledger whose writes always fail.
    #[derive(Debug)]
    struct BrokenLedger(InMemoryStore);

    #[async_trait]
    impl RewardLedger for BrokenLedger {
        async fn find_active(
            &self,
            owner: &OwnerId,
            reward_id: RewardId,
        ) -> Result<Option<IssuedReward>, GatewayError> {
            self.0.find_active(owner, reward_id).await
        }

        async fn insert_active(&self, _: &IssuedReward) -> Result<InsertOutcome, GatewayError> {
            Err(GatewayError::PersistenceError("connection reset".to_string()))
        }

        async fn get(
            &self,
            id: IssuedRewardId,
            owner: &OwnerId,
        ) -> Result<Option<IssuedReward>, GatewayError> {
            self.0.get(id, owner).await
        }

        async fn list_for_owner(
            &self,
            owner: &OwnerId,
        ) -> Result<Vec<IssuedReward>, GatewayError> {
            self.0.list_for_owner(owner).await
        }

        async fn transition(
            &self,
            _: IssuedRewardId,
            _: &OwnerId,
            _: RewardStatus,
            _: RewardStatus,
        ) -> Result<bool, GatewayError> {
            Err(GatewayError::PersistenceError("connection reset".to_string()))
        }

        async fn expire_overdue(
            &self,
            owner: &OwnerId,
            now: DateTime<Utc>,
        ) -> Result<u64, GatewayError> {
            self.0.expire_overdue(owner, now).await
        }
    }

    #[tokio::test]
    async fn failed_issue_write_surfaces_as_persistence_error() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = Arc::new(BrokenLedger(InMemoryStore::new()));
        let service = RewardService::new(
            Arc::<InMemoryStore>::clone(&store),
            Arc::<InMemoryStore>::clone(&store),
            Arc::<BrokenLedger>::clone(&ledger),
        );
        let Ok(_) = service.seed_default_catalog().await else {
            panic!("seed");
        };
        let who = owner("alice");
        gold_owner(&store, &who).await;

        let result = service
            .evaluate_at(&who, Some(2025), Some(3), None, at(2025, 4, 2))
            .await;
        assert!(matches!(result, Err(GatewayError::PersistenceError(_))));
        assert_eq!(ledger.0.count_with_status(RewardStatus::Active).await, 0);
    }

    #[tokio::test]
    async fn tiny_budget_is_not_eligible_instead_of_failing() {
        let (store, service) = setup().await;
        let who = owner("erin");
        gold_owner(&store, &who).await;
        let result = service
            .evaluate_at(&who, Some(2025), Some(3), Some(Decimal::new(1, 27)), at(2025, 4, 2))
            .await;
        let Ok(evaluation) = result else {
            panic!("evaluation failed");
        };
        assert_eq!(evaluation.decision, Decision::NotEligible);
        assert_eq!(evaluation.total_expense, Decimal::from(4000));
    }

    #[tokio::test]
    async fn overflowing_expense_total_is_rejected() {
        let (store, service) = setup().await;
        let who = owner("frank");
        let mut huge = tx(&who, TransactionKind::Expense, 0, at(2025, 3, 2));
        huge.amount = Decimal::MAX;
        let mut again = huge.clone();
        again.id = TransactionId::new();
        let Ok(()) = store.insert_many(&[huge, again]).await else {
            panic!("insert");
        };
        let result = service
            .evaluate_at(&who, Some(2025), Some(3), None, at(2025, 4, 2))
            .await;
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    /// Ledger that never sees an active record on lookup, as when another
    /// writer commits between the lookup and the insert.
    #[derive(Debug)]
    struct RacingLedger(InMemoryStore);

    #[async_trait]
    impl RewardLedger for RacingLedger {
        async fn find_active(
            &self,
            _: &OwnerId,
            _: RewardId,
        ) -> Result<Option<IssuedReward>, GatewayError> {
            Ok(None)
        }

        async fn insert_active(&self, issued: &IssuedReward) -> Result<InsertOutcome, GatewayError> {
            self.0.insert_active(issued).await
        }

        async fn get(
            &self,
            id: IssuedRewardId,
            owner: &OwnerId,
        ) -> Result<Option<IssuedReward>, GatewayError> {
            self.0.get(id, owner).await
        }

        async fn list_for_owner(
            &self,
            owner: &OwnerId,
        ) -> Result<Vec<IssuedReward>, GatewayError> {
            self.0.list_for_owner(owner).await
        }

        async fn transition(
            &self,
            id: IssuedRewardId,
            owner: &OwnerId,
            from: RewardStatus,
            to: RewardStatus,
        ) -> Result<bool, GatewayError> {
            self.0.transition(id, owner, from, to).await
        }

        async fn expire_overdue(
            &self,
            owner: &OwnerId,
            now: DateTime<Utc>,
        ) -> Result<u64, GatewayError> {
            self.0.expire_overdue(owner, now).await
        }
    }

    #[tokio::test]
    async fn lost_insert_race_reports_the_existing_record() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = Arc::new(RacingLedger(InMemoryStore::new()));
        let service = RewardService::new(
            Arc::<InMemoryStore>::clone(&store),
            Arc::<InMemoryStore>::clone(&store),
            Arc::<RacingLedger>::clone(&ledger),
        );
        let Ok(_) = service.seed_default_catalog().await else {
            panic!("seed");
        };
        let who = owner("gina");
        gold_owner(&store, &who).await;
        let now = at(2025, 4, 2);

        let Ok(first) = service.evaluate_at(&who, Some(2025), Some(3), None, now).await else {
            panic!("first evaluation failed");
        };
        let Decision::Issued { issued: winner, .. } = first.decision else {
            panic!("expected a fresh issue, got {:?}", first.decision);
        };

        let Ok(second) = service.evaluate_at(&who, Some(2025), Some(3), None, now).await else {
            panic!("second evaluation failed");
        };
        let Decision::AlreadyActive { tier, issued, .. } = second.decision else {
            panic!("expected already active, got {:?}", second.decision);
        };
        assert_eq!(tier, Tier::Gold);
        assert_eq!(issued.id, winner.id);
        assert_eq!(ledger.0.count_with_status(RewardStatus::Active).await, 1);
    }

    #[tokio::test]
    async fn concurrent_evaluations_share_one_issue() {
        let (store, service) = setup().await;
        let who = owner("hank");
        gold_owner(&store, &who).await;
        let now = at(2025, 4, 2);

        let (a, b) = tokio::join!(
            service.evaluate_at(&who, Some(2025), Some(3), None, now),
            service.evaluate_at(&who, Some(2025), Some(3), None, now),
        );
        let (Ok(a), Ok(b)) = (a, b) else {
            panic!("evaluations failed");
        };
        let ids: Vec<IssuedRewardId> = [a.decision, b.decision]
            .into_iter()
            .filter_map(|d| match d {
                Decision::Issued { issued, .. } | Decision::AlreadyActive { issued, .. } => {
                    Some(issued.id)
                }
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.first(), ids.get(1));
        assert_eq!(store.count_with_status(RewardStatus::Active).await, 1);
    }
}
