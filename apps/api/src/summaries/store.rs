//! Summary storage — the `SummaryStore` seam and its Postgres implementation.
//!
//! The (summary_date, category) UNIQUE constraint is the final word on the
//! one-row-per-key invariant. Both insert paths are single statements with a
//! conflict clause, so a concurrent writer can never produce a second row and
//! a sentinel can never replace a row that appeared in the meantime.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::summary::{Category, NewSummary, SummaryFields, SummaryRecord, SummaryRow};

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn find(
        &self,
        date: NaiveDate,
        category: Category,
    ) -> Result<Option<SummaryRecord>, AppError>;

    /// All summaries for a date, in catalog order.
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<SummaryRecord>, AppError>;

    /// Overwrites the mutable fields of an existing record.
    async fn update(
        &self,
        id: Uuid,
        fields: &SummaryFields,
        updated_at: DateTime<Utc>,
    ) -> Result<SummaryRecord, AppError>;

    /// Inserts a content record. If the key already exists the row's fields are
    /// overwritten instead.
    async fn insert(&self, summary: &NewSummary) -> Result<SummaryRecord, AppError>;

    /// Inserts only if the key is absent. `None` means a row already existed and
    /// nothing was written.
    async fn insert_if_absent(&self, summary: &NewSummary)
        -> Result<Option<SummaryRecord>, AppError>;
}

fn sort_by_catalog(records: &mut [SummaryRecord]) {
    records.sort_by_key(|r| r.category.ordinal());
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgSummaryStore {
    pool: PgPool,
}

impl PgSummaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SummaryStore for PgSummaryStore {
    async fn find(
        &self,
        date: NaiveDate,
        category: Category,
    ) -> Result<Option<SummaryRecord>, AppError> {
        let row: Option<SummaryRow> = sqlx::query_as(
            "SELECT * FROM investment_summaries WHERE summary_date = $1 AND category = $2",
        )
        .bind(date)
        .bind(category.code())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SummaryRecord::try_from).transpose()
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<SummaryRecord>, AppError> {
        let rows: Vec<SummaryRow> =
            sqlx::query_as("SELECT * FROM investment_summaries WHERE summary_date = $1")
                .bind(date)
                .fetch_all(&self.pool)
                .await?;

        let mut records = rows
            .into_iter()
            .map(SummaryRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        sort_by_catalog(&mut records);
        Ok(records)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: &SummaryFields,
        updated_at: DateTime<Utc>,
    ) -> Result<SummaryRecord, AppError> {
        let row: SummaryRow = sqlx::query_as(
            r#"
            UPDATE investment_summaries
            SET title = $1, content = $2, market_sentiment = $3, source_url = $4, updated_at = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(fields.market_sentiment.code())
        .bind(&fields.source_url)
        .bind(updated_at)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        SummaryRecord::try_from(row)
    }

    async fn insert(&self, summary: &NewSummary) -> Result<SummaryRecord, AppError> {
        let row: SummaryRow = sqlx::query_as(
            r#"
            INSERT INTO investment_summaries
                (id, category, summary_date, title, content, source_url, market_sentiment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (summary_date, category) DO UPDATE
            SET title = EXCLUDED.title,
                content = EXCLUDED.content,
                source_url = EXCLUDED.source_url,
                market_sentiment = EXCLUDED.market_sentiment,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(summary.category.code())
        .bind(summary.summary_date)
        .bind(&summary.fields.title)
        .bind(&summary.fields.content)
        .bind(&summary.fields.source_url)
        .bind(summary.fields.market_sentiment.code())
        .fetch_one(&self.pool)
        .await?;

        SummaryRecord::try_from(row)
    }

    async fn insert_if_absent(
        &self,
        summary: &NewSummary,
    ) -> Result<Option<SummaryRecord>, AppError> {
        let row: Option<SummaryRow> = sqlx::query_as(
            r#"
            INSERT INTO investment_summaries
                (id, category, summary_date, title, content, source_url, market_sentiment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (summary_date, category) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(summary.category.code())
        .bind(summary.summary_date)
        .bind(&summary.fields.title)
        .bind(&summary.fields.content)
        .bind(&summary.fields.source_url)
        .bind(summary.fields.market_sentiment.code())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SummaryRecord::try_from).transpose()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store for tests
// ────────────────────────────────────────────────────────────────────────────
