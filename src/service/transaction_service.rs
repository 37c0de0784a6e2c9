//! Transaction service: listing and recording money movements.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::category::categorize_description;
use crate::domain::{OwnerId, Transaction, TransactionFilter, TransactionId, TransactionKind};
use crate::error::GatewayError;
use crate::persistence::TransactionStore;

/// Largest batch accepted by [`TransactionService::record`].
pub const MAX_RECORD_BATCH: usize = 1000;

/// A transaction as submitted, before it gets an id and owner.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Non-negative magnitude.
    pub amount: Decimal,
    /// Direction.
    pub kind: TransactionKind,
    /// Category label; expenses without one are categorized by keyword.
    pub category: Option<String>,
    /// Statement description.
    pub description: String,
    /// When the money moved.
    pub occurred_at: DateTime<Utc>,
    /// Origin label.
    pub source: Option<String>,
}

/// Reads and records transactions.
#[derive(Debug, Clone)]
pub struct TransactionService {
    store: Arc<dyn TransactionStore>,
}

impl TransactionService {
    /// Creates a new `TransactionService`.
    #[must_use]
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Lists the owner's transactions, newest first, within optional
    /// inclusive bounds.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if `from` is after `to`.
    /// - [`GatewayError::PersistenceError`] if the store fails.
    pub async fn list(
        &self,
        owner: &OwnerId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>, GatewayError> {
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
            ..TransactionFilter::default()
        };
        self.store.find(owner, &filter).await
    }

    /// Records a batch for `owner`. All or nothing.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] for an empty or oversized batch,
    ///   or a negative amount.
    /// - [`GatewayError::PersistenceError`] if the store fails.
    pub async fn record(
        &self,
        owner: &OwnerId,
        batch: Vec<NewTransaction>,
    ) -> Result<Vec<Transaction>, GatewayError> {
        if batch.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "transactions must not be empty".to_string(),
            ));
        }
        if batch.len() > MAX_RECORD_BATCH {
            return Err(GatewayError::InvalidRequest(format!(
                "at most {MAX_RECORD_BATCH} transactions per request"
            )));
        }
        if let Some((i, _)) = batch
            .iter()
            .enumerate()
            .find(|(_, t)| t.amount < Decimal::ZERO)
        {
            return Err(GatewayError::InvalidRequest(format!(
                "transactions[{i}].amount must not be negative"
            )));
        }

        let txs: Vec<Transaction> = batch
            .into_iter()
            .map(|t| {
                let category = t
                    .category
                    .filter(|c| !c.trim().is_empty())
                    .or_else(|| {
                        (t.kind == TransactionKind::Expense)
                            .then(|| categorize_description(&t.description).to_string())
                    });
                Transaction {
                    id: TransactionId::new(),
                    owner_id: owner.clone(),
                    amount: t.amount,
                    kind: t.kind,
                    category,
                    description: t.description,
                    occurred_at: t.occurred_at,
                    source: t.source,
                }
            })
            .collect();

        self.store.insert_many(&txs).await?;
        tracing::info!(%owner, count = txs.len(), "transactions recorded");
        Ok(txs)
    }
}
