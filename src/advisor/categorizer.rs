//! Transaction categorization.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Source;
use super::llm::{ChatModel, CompletionOptions, extract_json};
use crate::domain::Category;
use crate::domain::category::categorize_description;
use crate::error::GatewayError;

const SYSTEM_PROMPT: &str = "You categorize bank transactions. Reply with JSON only.";

const OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 1000,
    temperature: 0.0,
};

/// One item to categorize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeItem {
    /// Caller-chosen index echoed back in the answer.
    pub index: usize,
    /// Statement description.
    #[serde(default)]
    pub description: String,
    /// Amount.
    #[serde(default)]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    /// Transaction date.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// The category chosen for one input index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryAssignment {
    /// Input index.
    pub index: usize,
    /// Assigned category.
    pub category: Category,
}

/// Categories for a batch, one entry per input item, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Categorization {
    /// Assignments.
    pub categories: Vec<CategoryAssignment>,
    /// Strategy that produced them.
    pub source: Source,
}

#[derive(Debug, Deserialize)]
struct RemoteAssignment {
    index: usize,
    category: String,
}

/// Keyword-rule categorization. Total: never drops an item.
#[must_use]
pub fn categorize_by_rules(items: &[CategorizeItem]) -> Vec<CategoryAssignment> {
    items
        .iter()
        .map(|item| CategoryAssignment {
            index: item.index,
            category: categorize_description(&item.description),
        })
        .collect()
}

/// Categorizer with an optional remote model.
#[derive(Debug, Clone)]
pub struct Categorizer {
    model: Option<Arc<dyn ChatModel>>,
    max_batch: usize,
}

impl Categorizer {
    /// Creates a categorizer; `max_batch` caps the items sent upstream.
    #[must_use]
    pub fn new(model: Option<Arc<dyn ChatModel>>, max_batch: usize) -> Self {
        Self { model, max_batch }
    }

    /// Categorizes every item.
    ///
    /// Remote answers are matched back by index. Labels outside the
    /// closed set and indices the model skipped (including items beyond
    /// the batch cap) are filled from the keyword rules.
    pub async fn categorize(&self, items: &[CategorizeItem]) -> Categorization {
        let rules = categorize_by_rules(items);
        let Some(model) = self.model.as_ref().filter(|_| !items.is_empty()) else {
            return Categorization {
                categories: rules,
                source: Source::Rules,
            };
        };

        let remote = match self.ask(model.as_ref(), items).await {
            Ok(remote) if !remote.is_empty() => remote,
            Ok(_) => {
                tracing::warn!("model returned no usable categories, using rules");
                return Categorization {
                    categories: rules,
                    source: Source::Rules,
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "categorization fell back to rules");
                return Categorization {
                    categories: rules,
                    source: Source::Rules,
                };
            }
        };

        let categories = rules
            .into_iter()
            .map(|fallback| CategoryAssignment {
                index: fallback.index,
                category: remote
                    .get(&fallback.index)
                    .copied()
                    .unwrap_or(fallback.category),
            })
            .collect();

        Categorization {
            categories,
            source: Source::Ai,
        }
    }

    async fn ask(
        &self,
        model: &dyn ChatModel,
        items: &[CategorizeItem],
    ) -> Result<HashMap<usize, Category>, GatewayError> {
        let batch: Vec<&CategorizeItem> = items.iter().take(self.max_batch.max(1)).collect();
        let prompt = build_prompt(&batch);
        let reply = model.complete(SYSTEM_PROMPT, &prompt, OPTIONS).await?;

        let parsed: Vec<RemoteAssignment> = extract_json(&reply).ok_or_else(|| {
            GatewayError::UpstreamUnavailable("unparseable categorization reply".to_string())
        })?;

        Ok(parsed
            .into_iter()
            .filter(|a| batch.iter().any(|item| item.index == a.index))
            .filter_map(|a| Some((a.index, a.category.parse::<Category>().ok()?)))
            .collect())
    }
}

fn build_prompt(batch: &[&CategorizeItem]) -> String {
    let allowed: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let mut prompt = format!(
        "Assign each transaction exactly one category from: {}.\n\
         Return a JSON array of objects {{\"index\": <number>, \"category\": <string>}}.\n\n",
        allowed.join(", ")
    );
    for item in batch {
        let date = item
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            prompt,
            "{} | {} | {} | {}",
            item.index, date, item.description, item.amount
        );
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::llm::testing::ScriptedModel;

    fn item(index: usize, description: &str) -> CategorizeItem {
        CategorizeItem {
            index,
            description: description.to_string(),
            amount: Decimal::from(100),
            date: None,
        }
    }

    fn batch() -> Vec<CategorizeItem> {
        vec![
            item(0, "SWIGGY ORDER 1234"),
            item(1, "UBER TRIP"),
            item(2, "mystery merchant"),
        ]
    }

    #[tokio::test]
    async fn without_model_uses_rules() {
        let out = Categorizer::new(None, 100).categorize(&batch()).await;
        assert_eq!(out.source, Source::Rules);
        let cats: Vec<Category> = out.categories.iter().map(|a| a.category).collect();
        assert_eq!(cats, vec![Category::Food, Category::Travel, Category::Other]);
    }

    #[tokio::test]
    async fn remote_answer_is_merged_by_index() {
        let model = Arc::new(ScriptedModel::replying(
            r#"```json
            [{"index": 2, "category": "shopping"}, {"index": 0, "category": "Food"}]
            ```"#,
        ));
        let out = Categorizer::new(Some(Arc::<ScriptedModel>::clone(&model)), 100)
            .categorize(&batch())
            .await;

        assert_eq!(model.calls(), 1);
        assert_eq!(out.source, Source::Ai);
        let cats: Vec<(usize, Category)> =
            out.categories.iter().map(|a| (a.index, a.category)).collect();
        // index 1 was skipped by the model and filled from the rules
        assert_eq!(
            cats,
            vec![
                (0, Category::Food),
                (1, Category::Travel),
                (2, Category::Shopping)
            ]
        );
    }

    #[tokio::test]
    async fn labels_outside_the_set_are_dropped() {
        let model = Arc::new(ScriptedModel::replying(
            r#"[{"index": 0, "category": "Groceries"}, {"index": 1, "category": "Bills"}, {"index": 9, "category": "Rent"}]"#,
        ));
        let out = Categorizer::new(Some(model), 100).categorize(&batch()).await;
        let cats: Vec<Category> = out.categories.iter().map(|a| a.category).collect();
        assert_eq!(cats, vec![Category::Food, Category::Bills, Category::Other]);
        assert_eq!(out.categories.len(), 3);
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back() {
        let model = Arc::new(ScriptedModel::replying("Sorry, I can't do that."));
        let out = Categorizer::new(Some(model), 100).categorize(&batch()).await;
        assert_eq!(out.source, Source::Rules);
        assert_eq!(out.categories.len(), 3);
    }

    #[tokio::test]
    async fn upstream_failure_falls_back() {
        let model = Arc::new(ScriptedModel::failing("timed out"));
        let out = Categorizer::new(Some(model), 100).categorize(&batch()).await;
        assert_eq!(out.source, Source::Rules);
        assert_eq!(out.categories.len(), 3);
    }

    #[tokio::test]
    async fn items_past_the_batch_cap_use_rules() {
        let model = Arc::new(ScriptedModel::replying(
            r#"[{"index": 0, "category": "Medical"}, {"index": 1, "category": "Medical"}]"#,
        ));
        let out = Categorizer::new(Some(model), 1).categorize(&batch()).await;
        let cats: Vec<Category> = out.categories.iter().map(|a| a.category).collect();
        assert_eq!(cats, vec![Category::Medical, Category::Travel, Category::Other]);
    }

    #[tokio::test]
    async fn empty_input_skips_the_model() {
        let model = Arc::new(ScriptedModel::replying("[]"));
        let out = Categorizer::new(Some(Arc::<ScriptedModel>::clone(&model)), 100)
            .categorize(&[])
            .await;
        assert!(out.categories.is_empty());
        assert_eq!(model.calls(), 0);
    }
}
