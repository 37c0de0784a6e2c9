//! Transaction DTOs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Transaction, TransactionKind};
use crate::service::NewTransaction;

/// One transaction in a record request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    /// Non-negative magnitude.
    pub amount: Decimal,
    /// `income` or `expense`.
    pub kind: TransactionKind,
    /// Category; expenses without one are categorized by keyword.
    #[serde(default)]
    pub category: Option<String>,
    /// Statement description.
    #[serde(default)]
    pub description: String,
    /// When the money moved.
    pub occurred_at: DateTime<Utc>,
    /// Origin label (e.g. `manual`, `statement`).
    #[serde(default)]
    pub source: Option<String>,
}

impl From<TransactionInput> for NewTransaction {
    fn from(input: TransactionInput) -> Self {
        Self {
            amount: input.amount,
            kind: input.kind,
            category: input.category,
            description: input.description,
            occurred_at: input.occurred_at,
            source: input.source,
        }
    }
}

/// Request body for `POST /transactions`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordTransactionsRequest {
    /// Owner of every transaction in the batch.
    #[serde(default)]
    pub owner_id: String,
    /// The batch.
    #[serde(default)]
    pub transactions: Vec<TransactionInput>,
}

/// Response body for `POST /transactions` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordTransactionsResponse {
    /// Number of rows stored.
    pub recorded: usize,
    /// Stored transactions with their ids.
    pub transactions: Vec<Transaction>,
}
