//! Summary Service — the per-category pipeline.
//!
//! Flow: build_prompt → generate (bounded by timeout) → parse_response → upsert_summary.
//!
//! Generation failures (provider error, transport error, timeout) stop here and
//! become the sentinel-or-untouched write. Only storage errors escape.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::errors::AppError;
use crate::llm_client::{GenerationClient, GenerationError};
use crate::models::summary::Category;
use crate::summaries::parser::{parse_response, GenerationResult};
use crate::summaries::prompts::build_prompt;
use crate::summaries::store::SummaryStore;
use crate::summaries::upsert::{upsert_summary, SummaryKey, UpsertOutcome};

#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn SummaryStore>,
    generator: Arc<dyn GenerationClient>,
    generation_timeout: Duration,
}

impl SummaryService {
    pub fn new(
        store: Arc<dyn SummaryStore>,
        generator: Arc<dyn GenerationClient>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            generation_timeout,
        }
    }

    /// Generates the summary for one (date, category) and stores it.
    pub async fn generate_and_save(
        &self,
        date: NaiveDate,
        category: Category,
    ) -> Result<UpsertOutcome, AppError> {
        let outcome = self.generate(date, category).await;
        if let Err(e) = &outcome {
            error!(
                "Summary generation failed: {} / {} → {e}",
                date,
                category.display_name()
            );
        }

        upsert_summary(self.store.as_ref(), SummaryKey { date, category }, outcome).await
    }

    async fn generate(
        &self,
        date: NaiveDate,
        category: Category,
    ) -> Result<GenerationResult, GenerationError> {
        let prompt = build_prompt(category, date);
        info!(
            "Requesting {} summary (date: {date})",
            category.display_name()
        );

        let response =
            match tokio::time::timeout(self.generation_timeout, self.generator.generate(&prompt))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(GenerationError::Timeout(self.generation_timeout)),
            };

        info!(
            "{} summary received ({} sources)",
            category.display_name(),
            response.source_urls.len()
        );

        Ok(parse_response(&response.text, response.source_urls))
    }
}
