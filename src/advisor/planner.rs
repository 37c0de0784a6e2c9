//! Savings plans for festivals and budget splits for events.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Source;
use super::llm::{ChatModel, CompletionOptions, extract_json};
use crate::error::GatewayError;

const SYSTEM_PROMPT: &str = "You are a practical savings planner. Reply with JSON only.";

const OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 700,
    temperature: 0.2,
};

/// Longest plan accepted, in weeks.
pub const MAX_PLAN_WEEKS: i64 = 156;

const WEEK_NOTE: &str = "Flexible target; if income arrives increase this week's target.";

const FESTIVAL_SPLIT: [(&str, Decimal); 3] = [
    ("Gifts", Decimal::from_parts(40, 0, 0, false, 2)),
    ("Food", Decimal::from_parts(40, 0, 0, false, 2)),
    ("Misc", Decimal::from_parts(20, 0, 0, false, 2)),
];

const EVENT_SPLIT: [(&str, Decimal); 4] = [
    ("Food", Decimal::from_parts(40, 0, 0, false, 2)),
    ("Venue", Decimal::from_parts(30, 0, 0, false, 2)),
    ("Gifts", Decimal::from_parts(20, 0, 0, false, 2)),
    ("Misc", Decimal::from_parts(10, 0, 0, false, 2)),
];

fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// A validated festival planning request.
#[derive(Debug, Clone, PartialEq)]
pub struct FestivalRequest {
    festival_date: NaiveDate,
    start_date: NaiveDate,
    incomes: Vec<Decimal>,
    desired_budget: Decimal,
}

impl FestivalRequest {
    /// Validates a request.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidRequest`] for a negative budget or a plan
    /// longer than [`MAX_PLAN_WEEKS`].
    pub fn new(
        festival_date: NaiveDate,
        start_date: NaiveDate,
        incomes: Vec<Decimal>,
        desired_budget: Decimal,
    ) -> Result<Self, GatewayError> {
        if desired_budget.is_sign_negative() {
            return Err(GatewayError::InvalidRequest(
                "desiredBudget must not be negative".to_string(),
            ));
        }
        let request = Self {
            festival_date,
            start_date,
            incomes,
            desired_budget,
        };
        if request.week_count() > MAX_PLAN_WEEKS {
            return Err(GatewayError::InvalidRequest(format!(
                "festivalDate is more than {MAX_PLAN_WEEKS} weeks away"
            )));
        }
        Ok(request)
    }

    /// Weeks between start and festival, at least one.
    #[must_use]
    pub fn week_count(&self) -> i64 {
        let days = (self.festival_date - self.start_date).num_days();
        if days <= 0 { 1 } else { (days + 6) / 7 }
    }
}

/// One week's savings target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekTarget {
    /// First day of the week.
    pub week_start: NaiveDate,
    /// Amount to put aside that week.
    #[schema(value_type = f64)]
    pub target_save: Decimal,
    /// Guidance for the week.
    #[serde(default)]
    pub notes: String,
}

/// A weekly savings plan leading up to a festival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FestivalPlan {
    /// Weekly targets in date order.
    pub weeks: Vec<WeekTarget>,
    /// Suggested spend per category.
    pub category_suggestions: BTreeMap<String, Decimal>,
    /// Overall savings target.
    #[schema(value_type = f64)]
    pub total_target: Decimal,
}

/// Even weekly split of the budget, rounded up.
#[must_use]
pub fn plan_by_rules(request: &FestivalRequest) -> FestivalPlan {
    let weeks = request.week_count();
    let target_save = (request.desired_budget / Decimal::from(weeks)).ceil();

    let weeks = (0..weeks)
        .map(|i| WeekTarget {
            week_start: request.start_date + Duration::weeks(i),
            target_save,
            notes: WEEK_NOTE.to_string(),
        })
        .collect();

    let category_suggestions = FESTIVAL_SPLIT
        .iter()
        .map(|(name, share)| ((*name).to_string(), round_whole(request.desired_budget * *share)))
        .collect();

    FestivalPlan {
        weeks,
        category_suggestions,
        total_target: request.desired_budget,
    }
}

/// Festival planner with an optional remote model.
#[derive(Debug, Clone)]
pub struct FestivalPlanner {
    model: Option<Arc<dyn ChatModel>>,
}

impl FestivalPlanner {
    /// Creates a planner.
    #[must_use]
    pub fn new(model: Option<Arc<dyn ChatModel>>) -> Self {
        Self { model }
    }

    /// Builds a plan and reports which strategy produced it.
    pub async fn plan(&self, request: &FestivalRequest) -> (FestivalPlan, Source) {
        let Some(model) = &self.model else {
            return (plan_by_rules(request), Source::Rules);
        };
        match ask(model.as_ref(), request).await {
            Ok(plan) => (plan, Source::Ai),
            Err(e) => {
                tracing::warn!(error = %e, "festival plan fell back to rules");
                (plan_by_rules(request), Source::Rules)
            }
        }
    }
}

async fn ask(model: &dyn ChatModel, request: &FestivalRequest) -> Result<FestivalPlan, GatewayError> {
    let incomes: Vec<String> = request.incomes.iter().map(Decimal::to_string).collect();
    let prompt = format!(
        "Festival date: {}\nStart date: {}\nRecent incomes: [{}]\nDesired budget: {}\n\n\
         Return JSON {{\"weeks\": [{{\"weekStart\": \"YYYY-MM-DD\", \"targetSave\": <number>, \
         \"notes\": <string>}}], \"categorySuggestions\": {{<category>: <number>}}, \
         \"totalTarget\": <number>}} with one entry per week from the start date.",
        request.festival_date,
        request.start_date,
        incomes.join(", "),
        request.desired_budget
    );

    let reply = model.complete(SYSTEM_PROMPT, &prompt, OPTIONS).await?;
    let plan: FestivalPlan = extract_json(&reply).ok_or_else(|| {
        GatewayError::UpstreamUnavailable("unparseable festival plan".to_string())
    })?;
    if plan.weeks.is_empty() {
        return Err(GatewayError::UpstreamUnavailable(
            "festival plan had no weeks".to_string(),
        ));
    }
    Ok(plan)
}

/// A validated event budgeting request.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRequest {
    event_name: String,
    attendees: u32,
    desired_budget: Decimal,
    priorities: Vec<String>,
}

impl EventRequest {
    /// Validates a request, applying defaults for missing fields.
    ///
    /// Blank and repeated priorities are dropped; an empty list means the
    /// default `Food, Venue, Gifts, Misc`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidRequest`] for a negative budget.
    pub fn new(
        event_name: Option<String>,
        attendees: Option<u32>,
        desired_budget: Decimal,
        priorities: Vec<String>,
    ) -> Result<Self, GatewayError> {
        if desired_budget.is_sign_negative() {
            return Err(GatewayError::InvalidRequest(
                "desiredBudget must not be negative".to_string(),
            ));
        }

        let mut cleaned: Vec<String> = Vec::with_capacity(priorities.len());
        for p in priorities {
            let p = p.trim();
            if !p.is_empty() && !cleaned.iter().any(|c| c == p) {
                cleaned.push(p.to_string());
            }
        }
        if cleaned.is_empty() {
            cleaned = EVENT_SPLIT.iter().map(|(n, _)| (*n).to_string()).collect();
        }

        Ok(Self {
            event_name: event_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Event".to_string()),
            attendees: attendees.unwrap_or(1).max(1),
            desired_budget,
            priorities: cleaned,
        })
    }
}

/// Suggested split of an event budget.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EventBudget {
    /// Amount per priority.
    pub budget: BTreeMap<String, Decimal>,
    /// Guidance.
    pub notes: String,
}

/// Splits the budget across priorities.
///
/// Known priorities take their default share; unknown ones take an equal
/// `1/len` share. Whole-unit rounding leftovers go to the last priority,
/// so the parts always sum to the budget.
#[must_use]
pub fn split_event_budget(request: &EventRequest) -> EventBudget {
    let equal_share = Decimal::ONE / Decimal::from(request.priorities.len().max(1));
    let mut remaining = request.desired_budget;
    let mut budget = BTreeMap::new();

    for priority in &request.priorities {
        let share = EVENT_SPLIT
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(priority))
            .map_or(equal_share, |(_, share)| *share);
        let amount = round_whole(request.desired_budget * share);
        remaining -= amount;
        budget.insert(priority.clone(), amount);
    }

    if let Some(last) = request.priorities.last()
        && let Some(amount) = budget.get_mut(last)
    {
        *amount += remaining;
    }

    EventBudget {
        budget,
        notes: format!(
            "Estimated split for {} for {} attendees. Adjust based on local prices.",
            request.event_name, request.attendees
        ),
    }
}
