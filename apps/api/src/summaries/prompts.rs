//! Prompt construction for the daily summary call.
//!
//! The output format demanded here is the contract `parser` reads back.
//! Change the markers in both places or not at all.

use chrono::NaiveDate;

use crate::models::summary::Category;

pub const TITLE_MARKER: &str = "TITLE:";
pub const SENTIMENT_MARKER: &str = "SENTIMENT:";
pub const CONTENT_MARKER: &str = "CONTENT:";

/// Daily summary prompt template.
/// Replace: {date}, {category}, {search_query}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"You are a professional investment analyst.
Use Google Search to find and analyse the latest "{category}" investment news published on {date},
focusing on Naver News (news.naver.com) and YouTube (youtube.com).

Search keywords: {search_query}

Respond ONLY in the format below. Do NOT add anything before or after it.

TITLE: [a headline of at most 30 characters]
SENTIMENT: [exactly one of POSITIVE, NEUTRAL, NEGATIVE]
CONTENT:
[A markdown investment summary containing these sections:
## Market Overview
(2-3 sentences on the overall market)

## Key Issues
- Issue 1
- Issue 2
- Issue 3

## Investment Insights
- Insight 1
- Insight 2

## Watchpoints for Tomorrow
(1-2 things to watch on the next trading day)]

IMPORTANT: TITLE:, SENTIMENT: and CONTENT: must all be present, each at the start of its own line."#;

/// Builds the grounded generation prompt for one category and target date.
pub fn build_prompt(category: Category, date: NaiveDate) -> String {
    SUMMARY_PROMPT_TEMPLATE
        .replace("{date}", &date.format("%Y-%m-%d").to_string())
        .replace("{category}", category.display_name())
        .replace("{search_query}", category.search_query())
}
