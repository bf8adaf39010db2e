use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::summary::SummaryRecord;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DateQuery {
    /// ISO-8601 (`YYYY-MM-DD`). Missing or empty means today in the schedule
    /// timezone.
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub id: Uuid,
    pub category: &'static str,
    pub category_display_name: &'static str,
    pub summary_date: NaiveDate,
    pub title: String,
    pub content: String,
    pub source_url: Option<String>,
    pub market_sentiment: &'static str,
    pub market_sentiment_display_name: &'static str,
    pub created_at: DateTime<Utc>,
}

impl From<SummaryRecord> for SummaryResponse {
    fn from(record: SummaryRecord) -> Self {
        Self {
            id: record.id,
            category: record.category.code(),
            category_display_name: record.category.display_name(),
            summary_date: record.summary_date,
            title: record.title,
            content: record.content,
            source_url: record.source_url,
            market_sentiment: record.market_sentiment.code(),
            market_sentiment_display_name: record.market_sentiment.display_name(),
            created_at: record.created_at,
        }
    }
}

/// GET /api/v1/summaries?date=YYYY-MM-DD
pub async fn handle_list_summaries(
    State(state): State<AppState>,
    Query(params): Query<DateQuery>,
) -> Result<Json<Vec<SummaryResponse>>, AppError> {
    let date = match params.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date '{raw}', expected YYYY-MM-DD")))?,
        None => Utc::now()
            .with_timezone(&state.config.schedule.timezone)
            .date_naive(),
    };

    let summaries = state.store.list_by_date(date).await?;
    Ok(Json(summaries.into_iter().map(SummaryResponse::from).collect()))
}
