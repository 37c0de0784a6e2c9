//! Tier classification from a period's spending.
//!
//! With a positive monthly budget the classifier looks at the spending
//! ratio (`expense / budget`, lower is better). Without one it falls
//! back to absolute spending thresholds. Both tables are ordered best
//! tier first and a value sitting exactly on a threshold belongs to the
//! better tier.

use rust_decimal::Decimal;

use super::Tier;

/// Ratio ceilings, best tier first. Values are hundredths.
const RATIO_THRESHOLDS: [(Tier, i64); 3] = [(Tier::Gold, 50), (Tier::Silver, 65), (Tier::Bronze, 85)];

/// Absolute spending ceilings used when no budget is known.
const ABSOLUTE_THRESHOLDS: [(Tier, i64); 3] = [
    (Tier::Gold, 5_000),
    (Tier::Silver, 15_000),
    (Tier::Bronze, 30_000),
];

/// Maps a period's expense total to a tier, or `None` if no tier applies.
///
/// A budget that is absent, zero or negative is treated as unknown. A
/// ratio too large to represent qualifies for no tier.
#[must_use]
pub fn classify(period_expense: Decimal, monthly_budget: Option<Decimal>) -> Option<Tier> {
    match monthly_budget {
        Some(budget) if budget > Decimal::ZERO => period_expense
            .checked_div(budget)
            .and_then(|ratio| first_within(&RATIO_THRESHOLDS, ratio, 2)),
        _ => first_within(&ABSOLUTE_THRESHOLDS, period_expense, 0),
    }
}

fn first_within(table: &[(Tier, i64)], value: Decimal, scale: u32) -> Option<Tier> {
    table
        .iter()
        .find(|(_, ceiling)| value <= Decimal::new(*ceiling, scale))
        .map(|(tier, _)| *tier)
}
