//! Monthly budget estimation from recent income.
//!
//! Best-effort heuristic used only when the caller does not state a
//! budget: the rounded mean of the three most recent incomes. It assumes
//! roughly one income per month and says nothing about irregular earners.

use rust_decimal::{Decimal, RoundingStrategy};

use super::{Transaction, TransactionKind};

/// How many recent income transactions the caller should fetch.
pub const INCOME_FETCH_LIMIT: usize = 12;

/// How many of the fetched incomes contribute to the mean.
pub const INCOME_SAMPLE_SIZE: usize = 3;

/// Estimates a monthly budget from income transactions ordered newest
/// first.
///
/// Non-income entries are skipped. Returns `None` when there is no income
/// to average or the mean rounds to zero.
#[must_use]
pub fn estimate<'a>(recent_incomes: impl IntoIterator<Item = &'a Transaction>) -> Option<Decimal> {
    let sample: Vec<Decimal> = recent_incomes
        .into_iter()
        .filter(|tx| tx.kind == TransactionKind::Income)
        .take(INCOME_SAMPLE_SIZE)
        .map(|tx| tx.amount)
        .collect();

    if sample.is_empty() {
        return None;
    }

    let count = Decimal::from(sample.len());
    let mean = match sample.iter().try_fold(Decimal::ZERO, |acc, x| acc.checked_add(*x)) {
        Some(sum) => sum / count,
        // Averaging the parts keeps every partial sum within range.
        None => sample
            .iter()
            .try_fold(Decimal::ZERO, |acc, x| acc.checked_add(*x / count))?,
    };
    let rounded = mean.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    (rounded > Decimal::ZERO).then_some(rounded)
}
