//! Upsert Manager — decides what a generation outcome does to storage.
//!
//! | outcome | existing row | action           |
//! |---------|--------------|------------------|
//! | success | yes          | update in place  |
//! | success | no           | insert content   |
//! | failure | no           | insert sentinel  |
//! | failure | yes          | leave untouched  |
//!
//! A failed call never modifies or marks data that is already stored.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::GenerationError;
use crate::models::summary::{Category, MarketSentiment, NewSummary, SummaryFields, SummaryRecord};
use crate::summaries::parser::GenerationResult;
use crate::summaries::store::SummaryStore;

/// Only this many citations are stored.
pub const MAX_SOURCE_URLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryKey {
    pub date: NaiveDate,
    pub category: Category,
}

#[derive(Debug, PartialEq)]
pub enum UpsertPlan {
    Update {
        existing: SummaryRecord,
        fields: SummaryFields,
    },
    Insert(NewSummary),
    InsertSentinel(NewSummary),
    LeaveUntouched(SummaryRecord),
}

/// What actually happened to the row.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Updated(SummaryRecord),
    Inserted(SummaryRecord),
    SentinelInserted(SummaryRecord),
    Untouched(SummaryRecord),
}

impl UpsertOutcome {
    pub fn record(&self) -> &SummaryRecord {
        match self {
            UpsertOutcome::Updated(r)
            | UpsertOutcome::Inserted(r)
            | UpsertOutcome::SentinelInserted(r)
            | UpsertOutcome::Untouched(r) => r,
        }
    }

    /// True when the generation call failed and the failure path ran.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            UpsertOutcome::SentinelInserted(_) | UpsertOutcome::Untouched(_)
        )
    }
}

/// Newline-joined first `MAX_SOURCE_URLS` citations, or `None` when there are none.
pub fn join_source_urls(urls: &[String]) -> Option<String> {
    if urls.is_empty() {
        return None;
    }
    Some(
        urls.iter()
            .take(MAX_SOURCE_URLS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

pub fn sentinel_fields(category: Category, error: &GenerationError) -> SummaryFields {
    SummaryFields {
        title: format!("[{}] Summary generation failed", category.display_name()),
        content: format!("An error occurred while generating the summary: {error}"),
        market_sentiment: MarketSentiment::Neutral,
        source_url: None,
    }
}

/// Pure decision step. No I/O.
pub fn plan_upsert(
    key: SummaryKey,
    existing: Option<SummaryRecord>,
    outcome: Result<GenerationResult, GenerationError>,
) -> UpsertPlan {
    match (outcome, existing) {
        (Ok(result), Some(existing)) => UpsertPlan::Update {
            existing,
            fields: content_fields(result),
        },
        (Ok(result), None) => UpsertPlan::Insert(NewSummary {
            summary_date: key.date,
            category: key.category,
            fields: content_fields(result),
        }),
        (Err(error), None) => UpsertPlan::InsertSentinel(NewSummary {
            summary_date: key.date,
            category: key.category,
            fields: sentinel_fields(key.category, &error),
        }),
        (Err(_), Some(existing)) => UpsertPlan::LeaveUntouched(existing),
    }
}

fn content_fields(result: GenerationResult) -> SummaryFields {
    SummaryFields {
        source_url: join_source_urls(&result.source_urls),
        title: result.title,
        content: result.content,
        market_sentiment: result.market_sentiment,
    }
}

/// Looks up the key, plans, and writes. Safe to call repeatedly for one key.
/// Storage errors propagate; generation errors never do.
pub async fn upsert_summary(
    store: &dyn SummaryStore,
    key: SummaryKey,
    outcome: Result<GenerationResult, GenerationError>,
) -> Result<UpsertOutcome, AppError> {
    let existing = store.find(key.date, key.category).await?;

    match plan_upsert(key, existing, outcome) {
        UpsertPlan::Update { existing, fields } => {
            info!(
                "Updating existing summary: {} / {}",
                key.date,
                key.category.display_name()
            );
            let record = store.update(existing.id, &fields, Utc::now()).await?;
            Ok(UpsertOutcome::Updated(record))
        }
        UpsertPlan::Insert(summary) => {
            info!(
                "Saving new summary: {} / {}",
                key.date,
                key.category.display_name()
            );
            let record = store.insert(&summary).await?;
            Ok(UpsertOutcome::Inserted(record))
        }
        UpsertPlan::InsertSentinel(summary) => {
            warn!(
                "Recording failure sentinel: {} / {}",
                key.date,
                key.category.display_name()
            );
            match store.insert_if_absent(&summary).await? {
                Some(record) => Ok(UpsertOutcome::SentinelInserted(record)),
                // Another writer got there first; its row stands.
                None => {
                    let record = store.find(key.date, key.category).await?.ok_or_else(|| {
                        AppError::Internal(anyhow::anyhow!(
                            "Summary {} / {} vanished after a conflicting insert",
                            key.date,
                            key.category.code()
                        ))
                    })?;
                    Ok(UpsertOutcome::Untouched(record))
                }
            }
        }
        UpsertPlan::LeaveUntouched(existing) => {
            warn!(
                "Generation failed; keeping existing summary: {} / {}",
                key.date,
                key.category.display_name()
            );
            Ok(UpsertOutcome::Untouched(existing))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::summaries::store::memory::MemoryStore;

    fn key(y: i32, m: u32, d: u32, category: Category) -> SummaryKey {
        SummaryKey {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            category,
        }
    }

    fn result(title: &str, urls: usize) -> GenerationResult {
        GenerationResult {
            title: title.to_string(),
            content: format!("{title} body"),
            market_sentiment: MarketSentiment::Positive,
            source_urls: (1..=urls).map(|i| format!("https://src{i}.example")).collect(),
        }
    }

    fn transport_error() -> GenerationError {
        GenerationError::Timeout(Duration::from_secs(120))
    }

    #[test]
    fn test_join_source_urls_keeps_first_five_in_order() {
        let urls: Vec<String> = (1..=7).map(|i| format!("https://src{i}.example")).collect();
        assert_eq!(
            join_source_urls(&urls).unwrap(),
            "https://src1.example\nhttps://src2.example\nhttps://src3.example\nhttps://src4.example\nhttps://src5.example"
        );
    }

    #[test]
    fn test_join_source_urls_empty_is_none() {
        assert_eq!(join_source_urls(&[]), None);
    }

    #[test]
    fn test_plan_failure_with_existing_leaves_untouched() {
        let k = key(2024, 5, 1, Category::Equity);
        let existing = SummaryRecord {
            id: uuid::Uuid::new_v4(),
            category: k.category,
            summary_date: k.date,
            title: "prior".to_string(),
            content: "prior body".to_string(),
            source_url: None,
            market_sentiment: MarketSentiment::Negative,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let plan = plan_upsert(k, Some(existing.clone()), Err(transport_error()));
        assert_eq!(plan, UpsertPlan::LeaveUntouched(existing));
    }

    #[test]
    fn test_plan_failure_without_existing_builds_sentinel() {
        let k = key(2024, 5, 2, Category::Crypto);
        let error = GenerationError::Provider {
            code: Some(500),
            message: "backend unavailable".to_string(),
        };
        match plan_upsert(k, None, Err(error)) {
            UpsertPlan::InsertSentinel(summary) => {
                assert_eq!(summary.fields.title, "[Crypto] Summary generation failed");
                assert!(summary.fields.content.contains("backend unavailable"));
                assert_eq!(summary.fields.market_sentiment, MarketSentiment::Neutral);
                assert_eq!(summary.fields.source_url, None);
            }
            other => panic!("expected sentinel, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_success_updates_single_record() {
        let store = MemoryStore::new();
        let k = key(2024, 5, 1, Category::Commodity);

        let first = upsert_summary(&store, k, Ok(result("first", 2))).await.unwrap();
        let after_first = Utc::now();
        let second = upsert_summary(&store, k, Ok(result("second", 0))).await.unwrap();

        assert!(matches!(first, UpsertOutcome::Inserted(_)));
        assert!(matches!(second, UpsertOutcome::Updated(_)));

        let all = store.all();
        assert_eq!(all.len(), 1);
        let record = &all[0];
        assert_eq!(record.id, first.record().id);
        assert_eq!(record.title, "second");
        assert_eq!(record.content, "second body");
        assert_eq!(record.source_url, None);
        assert_eq!(record.created_at, first.record().created_at);
        assert!(record.updated_at >= after_first);
    }

    #[tokio::test]
    async fn test_failure_keeps_existing_record_unchanged() {
        let store = MemoryStore::new();
        let k = key(2024, 5, 1, Category::Equity);
        upsert_summary(&store, k, Ok(result("good day", 3))).await.unwrap();
        let before = store.all();

        let outcome = upsert_summary(&store, k, Err(transport_error())).await.unwrap();

        assert!(matches!(outcome, UpsertOutcome::Untouched(_)));
        assert!(outcome.is_generation_failure());
        assert_eq!(store.all(), before);
    }

    #[tokio::test]
    async fn test_failure_without_record_inserts_one_sentinel() {
        let store = MemoryStore::new();
        let k = key(2024, 5, 2, Category::Crypto);
        let error = GenerationError::Provider {
            code: Some(503),
            message: "model overloaded".to_string(),
        };

        let outcome = upsert_summary(&store, k, Err(error)).await.unwrap();

        assert!(matches!(outcome, UpsertOutcome::SentinelInserted(_)));
        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "[Crypto] Summary generation failed");
        assert!(all[0].content.contains("model overloaded"));
        assert_eq!(all[0].source_url, None);
    }

    #[tokio::test]
    async fn test_repeated_failures_do_not_touch_sentinel() {
        let store = MemoryStore::new();
        let k = key(2024, 5, 2, Category::RealEstate);

        upsert_summary(&store, k, Err(transport_error())).await.unwrap();
        let before = store.all();
        upsert_summary(&store, k, Err(transport_error())).await.unwrap();

        assert_eq!(store.all(), before);
    }

    #[tokio::test]
    async fn test_success_replaces_sentinel() {
        let store = MemoryStore::new();
        let k = key(2024, 5, 3, Category::Equity);

        upsert_summary(&store, k, Err(transport_error())).await.unwrap();
        upsert_summary(&store, k, Ok(result("recovered", 1))).await.unwrap();

        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "recovered");
        assert_eq!(all[0].source_url.as_deref(), Some("https://src1.example"));
    }

    #[tokio::test]
    async fn test_seven_sources_store_first_five() {
        let store = MemoryStore::new();
        let k = key(2024, 5, 4, Category::Crypto);

        let outcome = upsert_summary(&store, k, Ok(result("cited", 7))).await.unwrap();

        let stored = outcome.record().source_url.clone().unwrap();
        let lines: Vec<&str> = stored.split('\n').collect();
        assert_eq!(lines.len(), MAX_SOURCE_URLS);
        assert_eq!(lines[0], "https://src1.example");
        assert_eq!(lines[4], "https://src5.example");
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let store = MemoryStore::failing_writes_for(Category::Equity);
        let k = key(2024, 5, 1, Category::Equity);

        let err = upsert_summary(&store, k, Ok(result("x", 0))).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
    }
}
