use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

/// Investment categories summarised every day, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Equity,
    Crypto,
    Commodity,
    RealEstate,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Equity,
        Category::Crypto,
        Category::Commodity,
        Category::RealEstate,
    ];

    /// Storage and API code.
    pub fn code(&self) -> &'static str {
        match self {
            Category::Equity => "EQUITY",
            Category::Crypto => "CRYPTO",
            Category::Commodity => "COMMODITY",
            Category::RealEstate => "REAL_ESTATE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Equity => "Stocks",
            Category::Crypto => "Crypto",
            Category::Commodity => "Commodities",
            Category::RealEstate => "Real Estate",
        }
    }

    /// Search hint handed to the grounded model. Only the prompt builder reads this.
    pub fn search_query(&self) -> &'static str {
        match self {
            Category::Equity => {
                "KOSPI KOSDAQ Korean stock market investment news site:news.naver.com OR site:youtube.com"
            }
            Category::Crypto => {
                "bitcoin ethereum cryptocurrency investment news site:news.naver.com OR site:youtube.com"
            }
            Category::Commodity => {
                "crude oil WTI gold commodities investment news site:news.naver.com OR site:youtube.com"
            }
            Category::RealEstate => {
                "Korean real estate apartment prices investment news site:news.naver.com OR site:youtube.com"
            }
        }
    }

    pub fn from_code(code: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Position in the catalog; used to keep listings in processing order.
    pub fn ordinal(&self) -> usize {
        match self {
            Category::Equity => 0,
            Category::Crypto => 1,
            Category::Commodity => 2,
            Category::RealEstate => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl MarketSentiment {
    pub const ALL: [MarketSentiment; 3] = [
        MarketSentiment::Positive,
        MarketSentiment::Neutral,
        MarketSentiment::Negative,
    ];

    /// Literal name shared by storage and the prompt/parse contract.
    pub fn code(&self) -> &'static str {
        match self {
            MarketSentiment::Positive => "POSITIVE",
            MarketSentiment::Neutral => "NEUTRAL",
            MarketSentiment::Negative => "NEGATIVE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MarketSentiment::Positive => "Positive",
            MarketSentiment::Neutral => "Neutral",
            MarketSentiment::Negative => "Negative",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_code(code: &str) -> Option<MarketSentiment> {
        MarketSentiment::ALL.into_iter().find(|s| s.code() == code)
    }
}

/// Raw row of `investment_summaries`. Enum columns are stored as their codes.
#[derive(Debug, Clone, FromRow)]
pub struct SummaryRow {
    pub id: Uuid,
    pub category: String,
    pub summary_date: NaiveDate,
    pub title: String,
    pub content: String,
    pub source_url: Option<String>,
    pub market_sentiment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One stored summary, unique per (summary_date, category).
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub id: Uuid,
    pub category: Category,
    pub summary_date: NaiveDate,
    pub title: String,
    pub content: String,
    pub source_url: Option<String>,
    pub market_sentiment: MarketSentiment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for SummaryRecord {
    type Error = AppError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        let category = Category::from_code(&row.category).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Unknown category code '{}' in summary {}",
                row.category,
                row.id
            ))
        })?;
        let market_sentiment = MarketSentiment::from_code(&row.market_sentiment).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Unknown sentiment code '{}' in summary {}",
                row.market_sentiment,
                row.id
            ))
        })?;

        Ok(SummaryRecord {
            id: row.id,
            category,
            summary_date: row.summary_date,
            title: row.title,
            content: row.content,
            source_url: row.source_url,
            market_sentiment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Mutable fields written by the upsert path.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFields {
    pub title: String,
    pub content: String,
    pub market_sentiment: MarketSentiment,
    pub source_url: Option<String>,
}

/// A record that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSummary {
    pub summary_date: NaiveDate,
    pub category: Category,
    pub fields: SummaryFields,
}
