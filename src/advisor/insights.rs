//! Spending advice.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Source;
use super::llm::{ChatModel, CompletionOptions, extract_json};
use crate::error::GatewayError;

const SYSTEM_PROMPT: &str = "You are a concise personal finance coach. Reply with JSON only.";

const OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 600,
    temperature: 0.2,
};

const TOP_CATEGORIES: usize = 3;

/// Aggregated spending handed to the advisor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpendingSummary {
    /// Expense total per category label.
    pub by_category: BTreeMap<String, Decimal>,
    /// Sum of all expenses in the window.
    pub total_expense: Decimal,
    /// Estimated monthly income, if known.
    pub avg_income: Option<Decimal>,
}

impl SpendingSummary {
    /// Category labels ordered by spend, largest first; ties by name.
    #[must_use]
    pub fn top_categories(&self, n: usize) -> Vec<&str> {
        let mut ranked: Vec<(&String, &Decimal)> = self.by_category.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1));
        ranked.into_iter().take(n).map(|(k, _)| k.as_str()).collect()
    }
}

/// Advice returned to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Advice {
    /// Top spending problems.
    pub problems: Vec<String>,
    /// Practical tips.
    pub tips: Vec<String>,
    /// One micro-action to take today.
    pub action: String,
    /// One-sentence explanation.
    pub explanation: String,
}

/// Deterministic advice built from the top categories.
#[must_use]
pub fn advice_by_rules(summary: &SpendingSummary) -> Advice {
    let top = summary.top_categories(TOP_CATEGORIES);
    let explanation = if top.is_empty() {
        "No expenses were recorded in this window, so there is nothing to trim yet.".to_string()
    } else {
        format!(
            "Top spends are {}, which are large contributors to monthly expense. \
             Small behavioral changes can free up cash quickly.",
            top.join(", ")
        )
    };

    Advice {
        problems: top.iter().map(|c| (*c).to_string()).collect(),
        tips: vec![
            "Set a weekly spending cap for the top category.".to_string(),
            "Replace 2 paid food orders with home-cooked meals this week.".to_string(),
            "Move 10% of savings into a separate account at paycheck time.".to_string(),
        ],
        action: "Uninstall or sign out of food delivery apps for 48 hours to reduce impulse orders."
            .to_string(),
        explanation,
    }
}

/// Advice generator with an optional remote model.
#[derive(Debug, Clone)]
pub struct InsightAdvisor {
    model: Option<Arc<dyn ChatModel>>,
}

impl InsightAdvisor {
    /// Creates an advisor.
    #[must_use]
    pub fn new(model: Option<Arc<dyn ChatModel>>) -> Self {
        Self { model }
    }

    /// Produces advice for `summary` and reports which strategy answered.
    pub async fn advise(&self, summary: &SpendingSummary) -> (Advice, Source) {
        let Some(model) = &self.model else {
            return (advice_by_rules(summary), Source::Rules);
        };
        match ask(model.as_ref(), summary).await {
            Ok(advice) => (advice, Source::Ai),
            Err(e) => {
                tracing::warn!(error = %e, "insights fell back to rules");
                (advice_by_rules(summary), Source::Rules)
            }
        }
    }
}

async fn ask(model: &dyn ChatModel, summary: &SpendingSummary) -> Result<Advice, GatewayError> {
    let by_category = serde_json::to_string(&summary.by_category)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    let income = summary
        .avg_income
        .map_or_else(|| "unknown".to_string(), |v| v.to_string());
    let prompt = format!(
        "Monthly spending by category: {by_category}\n\
         Total expense: {}\nAverage monthly income: {income}\n\n\
         Return JSON with keys: problems (top 3 spending problems), tips (3 practical tips), \
         action (one micro-action for today), explanation (one sentence).",
        summary.total_expense
    );

    let reply = model.complete(SYSTEM_PROMPT, &prompt, OPTIONS).await?;
    let advice: Advice = extract_json(&reply).ok_or_else(|| {
        GatewayError::UpstreamUnavailable("unparseable insights reply".to_string())
    })?;
    if advice.problems.is_empty() {
        return Err(GatewayError::UpstreamUnavailable(
            "insights reply listed no problems".to_string(),
        ));
    }
    Ok(advice)
}
