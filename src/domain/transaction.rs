//! Recorded money movements.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{OwnerId, TransactionId};
use crate::error::GatewayError;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money coming in (salary, refunds).
    Income,
    /// Money going out.
    Expense,
}

impl TransactionKind {
    /// Returns the storage discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(GatewayError::InvalidRequest(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// A dated, typed, optionally categorized money movement.
///
/// `amount` is the non-negative magnitude; direction lives in `kind`.
/// Transactions are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Owning account.
    pub owner_id: OwnerId,
    /// Magnitude of the movement.
    #[schema(value_type = f64)]
    pub amount: Decimal,
    /// Income or expense.
    pub kind: TransactionKind,
    /// Free-form category label, if known.
    pub category: Option<String>,
    /// Statement description (merchant text).
    pub description: String,
    /// When the movement happened.
    pub occurred_at: DateTime<Utc>,
    /// Where the record came from (e.g. an uploaded statement name).
    pub source: Option<String>,
}

/// Filter applied when reading an owner's transactions.
///
/// Bounds are inclusive. Results are always returned newest first.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one direction.
    pub kind: Option<TransactionKind>,
    /// Earliest `occurred_at` to include.
    pub from: Option<DateTime<Utc>>,
    /// Latest `occurred_at` to include.
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
}

impl TransactionFilter {
    /// Returns a filter selecting only transactions of `kind`.
    #[must_use]
    pub fn of_kind(kind: TransactionKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Restricts the filter to the inclusive `[from, to]` window.
    #[must_use]
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub fn limited(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if `tx` passes the kind and date predicates.
    ///
    /// The limit is not part of the predicate; stores apply it after
    /// ordering.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(kind) = self.kind
            && tx.kind != kind
        {
            return false;
        }
        if let Some(from) = self.from
            && tx.occurred_at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && tx.occurred_at > to
        {
            return false;
        }
        true
    }
}

/// Sums the amounts of all expense transactions in `txs`.
///
/// # Errors
///
/// [`GatewayError::InvalidRequest`] if the total does not fit a `Decimal`.
pub fn total_expense<'a>(
    txs: impl IntoIterator<Item = &'a Transaction>,
) -> Result<Decimal, GatewayError> {
    txs.into_iter()
        .filter(|tx| tx.kind == TransactionKind::Expense)
        .try_fold(Decimal::ZERO, |total, tx| add_amount(total, tx.amount))
}

/// Adds two amounts, reporting overflow instead of panicking.
///
/// # Errors
///
/// [`GatewayError::InvalidRequest`] if the sum does not fit a `Decimal`.
pub fn add_amount(total: Decimal, amount: Decimal) -> Result<Decimal, GatewayError> {
    total.checked_add(amount).ok_or_else(|| {
        GatewayError::InvalidRequest(
            "transaction amounts overflow the supported range".to_string(),
        )
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tx(kind: TransactionKind, amount: i64, day: u32) -> Transaction {
        let Some(at) = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).single() else {
            panic!("valid date");
        };
        Transaction {
            id: TransactionId::new(),
            owner_id: OwnerId::parse("owner-1").unwrap_or_else(|_| panic!("valid owner")),
            amount: Decimal::from(amount),
            kind,
            category: None,
            description: String::new(),
            occurred_at: at,
            source: None,
        }
    }

    #[test]
    fn kind_parses_storage_strings() {
        assert_eq!("income".parse::<TransactionKind>().ok(), Some(TransactionKind::Income));
        assert_eq!("expense".parse::<TransactionKind>().ok(), Some(TransactionKind::Expense));
        assert!("transfer".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn total_expense_ignores_income() {
        let txs = vec![
            tx(TransactionKind::Expense, 100, 1),
            tx(TransactionKind::Income, 5000, 2),
            tx(TransactionKind::Expense, 250, 3),
        ];
        assert_eq!(total_expense(&txs).ok(), Some(Decimal::from(350)));
    }

    #[test]
    fn total_expense_overflow_is_an_error() {
        let mut huge = tx(TransactionKind::Expense, 0, 1);
        huge.amount = Decimal::MAX;
        let txs = vec![huge.clone(), huge, tx(TransactionKind::Income, 1, 2)];
        assert!(matches!(
            total_expense(&txs),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let first = tx(TransactionKind::Expense, 1, 1);
        let last = tx(TransactionKind::Expense, 1, 31);
        let filter = TransactionFilter::of_kind(TransactionKind::Expense)
            .between(first.occurred_at, last.occurred_at);
        assert!(filter.matches(&first));
        assert!(filter.matches(&last));
        assert!(!filter.matches(&tx(TransactionKind::Income, 1, 15)));
    }
}
