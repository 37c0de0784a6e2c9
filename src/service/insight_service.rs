//! Insight service: categorization, spending advice and planners.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::advisor::planner::split_event_budget;
use crate::advisor::{
    Advice, Advisor, Categorization, CategorizeItem, EventBudget, EventRequest, FestivalPlan,
    FestivalRequest, Source, SpendingSummary,
};
use crate::domain::budget::{self, INCOME_FETCH_LIMIT};
use crate::domain::transaction::{add_amount, total_expense};
use crate::domain::{Category, OwnerId, TransactionFilter, TransactionKind};
use crate::error::GatewayError;
use crate::persistence::TransactionStore;

/// Recent transactions pulled when categorizing by owner.
pub const DEFAULT_CATEGORIZE_LIMIT: usize = 50;

/// Expenses sampled for insights when the caller gives no limit.
pub const DEFAULT_SAMPLE_LIMIT: usize = 500;

/// Hard cap on either limit.
pub const MAX_LIMIT: usize = 5000;

/// What to categorize.
#[derive(Debug, Clone, PartialEq)]
pub enum CategorizeInput {
    /// Caller-supplied items.
    Items(Vec<CategorizeItem>),
    /// The owner's most recent transactions.
    Recent {
        /// Owner.
        owner: OwnerId,
        /// How many to pull.
        limit: Option<usize>,
    },
}

/// Advice plus the data it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Insights {
    /// Advice text.
    pub advice: Advice,
    /// Strategy that produced the advice.
    pub source: Source,
    /// Expense total per category.
    pub summary: BTreeMap<String, Decimal>,
    /// Sum of sampled expenses.
    pub total_expense: Decimal,
}

/// Front for the advisory capabilities.
#[derive(Debug, Clone)]
pub struct InsightService {
    transactions: Arc<dyn TransactionStore>,
    advisor: Advisor,
}

impl InsightService {
    /// Creates a new `InsightService`.
    #[must_use]
    pub fn new(transactions: Arc<dyn TransactionStore>, advisor: Advisor) -> Self {
        Self {
            transactions,
            advisor,
        }
    }

    /// Categorizes explicit items or the owner's recent transactions.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if transactions cannot be
    /// read. Capability failures never surface; they fall back to rules.
    pub async fn categorize(&self, input: CategorizeInput) -> Result<Categorization, GatewayError> {
        let items = match input {
            CategorizeInput::Items(items) => items,
            CategorizeInput::Recent { owner, limit } => {
                let limit = limit.unwrap_or(DEFAULT_CATEGORIZE_LIMIT).clamp(1, MAX_LIMIT);
                self.transactions
                    .find(&owner, &TransactionFilter::default().limited(limit))
                    .await?
                    .into_iter()
                    .enumerate()
                    .map(|(index, tx)| CategorizeItem {
                        index,
                        description: tx.description,
                        amount: tx.amount,
                        date: Some(tx.occurred_at),
                    })
                    .collect()
            }
        };

        let out = self.advisor.categorizer.categorize(&items).await;
        tracing::info!(items = items.len(), source = ?out.source, "categorized");
        Ok(out)
    }

    /// Summarizes the owner's expenses in an optional window and advises.
    ///
    /// Expenses without a category count as `Other`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if `from` is after `to`.
    /// - [`GatewayError::PersistenceError`] if transactions cannot be read.
    pub async fn insights(
        &self,
        owner: &OwnerId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        sample_limit: Option<usize>,
    ) -> Result<Insights, GatewayError> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(GatewayError::InvalidRequest(
                "from must not be after to".to_string(),
            ));
        }

        let filter = TransactionFilter {
            from,
            to,
            ..TransactionFilter::of_kind(TransactionKind::Expense)
        }
        .limited(sample_limit.unwrap_or(DEFAULT_SAMPLE_LIMIT).clamp(1, MAX_LIMIT));
        let expenses = self.transactions.find(owner, &filter).await?;

        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        for tx in &expenses {
            let label = tx
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(Category::Other.as_str());
            let slot = by_category.entry(label.to_string()).or_default();
            *slot = add_amount(*slot, tx.amount)?;
        }

        let incomes = self
            .transactions
            .find(
                owner,
                &TransactionFilter::of_kind(TransactionKind::Income).limited(INCOME_FETCH_LIMIT),
            )
            .await?;

        let summary = SpendingSummary {
            by_category,
            total_expense: total_expense(&expenses)?,
            avg_income: budget::estimate(&incomes),
        };
        let (advice, source) = self.advisor.insights.advise(&summary).await;
        tracing::info!(%owner, expenses = expenses.len(), source = ?source, "insights generated");

        Ok(Insights {
            advice,
            source,
            summary: summary.by_category,
            total_expense: summary.total_expense,
        })
    }

    /// Builds a weekly savings plan for a festival.
    pub async fn festival_plan(&self, request: &FestivalRequest) -> (FestivalPlan, Source) {
        self.advisor.festival.plan(request).await
    }

    /// Splits an event budget across priorities.
    #[must_use]
    pub fn event_budget(&self, request: &EventRequest) -> EventBudget {
        split_event_budget(request)
    }
}
