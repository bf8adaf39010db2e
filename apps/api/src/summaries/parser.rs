//! Response Parser — turns the model's semi-structured reply into summary fields.
//!
//! Every field is located by its own search over the whole reply, so markers
//! may come in any order and surrounding chatter is ignored. Parsing never
//! fails: anything missing falls back to a default.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::summary::MarketSentiment;

/// Title used when the reply carries no usable `TITLE:` line.
pub const DEFAULT_TITLE: &str = "Investment Summary";

/// Matches the `title` column width.
pub const MAX_TITLE_CHARS: usize = 200;

/// Markers only count at the start of a line.
static TITLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*TITLE:[ \t]*(.*)$").expect("title regex is valid"));

static SENTIMENT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*SENTIMENT:(.*)$").expect("sentiment regex is valid"));

/// `CONTENT:` line; the body starts right after the match.
static CONTENT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*CONTENT:[ \t]*\r?\n").expect("content regex is valid"));

/// Parsed reply plus the citations returned alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub title: String,
    pub content: String,
    pub market_sentiment: MarketSentiment,
    /// Provider order, not truncated.
    pub source_urls: Vec<String>,
}

pub fn parse_response(raw_text: &str, source_urls: Vec<String>) -> GenerationResult {
    GenerationResult {
        title: extract_title(raw_text).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        content: extract_content(raw_text).unwrap_or_else(|| raw_text.trim().to_string()),
        market_sentiment: extract_sentiment(raw_text).unwrap_or_default(),
        source_urls,
    }
}

/// First `TITLE:` line, trimmed and capped. A blank title counts as missing.
fn extract_title(raw_text: &str) -> Option<String> {
    let captures = TITLE_LINE.captures(raw_text)?;
    let title = captures.get(1)?.as_str().trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().take(MAX_TITLE_CHARS).collect())
}

/// First `SENTIMENT:` line whose value is exactly a sentiment code.
fn extract_sentiment(raw_text: &str) -> Option<MarketSentiment> {
    SENTIMENT_LINE
        .captures_iter(raw_text)
        .filter_map(|c| c.get(1))
        .find_map(|value| MarketSentiment::from_code(value.as_str().trim()))
}

/// Everything after the first `CONTENT:` header, trimmed. Empty counts as missing.
fn extract_content(raw_text: &str) -> Option<String> {
    let header = CONTENT_HEADER.find(raw_text)?;
    let content = raw_text[header.end()..].trim();
    if content.is_empty() {
        return None;
    }
    Some(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "TITLE: KOSPI rebounds on chip rally\n\
        SENTIMENT: POSITIVE\n\
        CONTENT:\n\
        ## Market Overview\n\
        Stocks rose.\n\n\
        ## Key Issues\n\
        - Semiconductors\n";

    #[test]
    fn test_well_formed_reply_parses_all_fields() {
        let result = parse_response(WELL_FORMED, vec!["https://a.example".to_string()]);
        assert_eq!(result.title, "KOSPI rebounds on chip rally");
        assert_eq!(result.market_sentiment, MarketSentiment::Positive);
        assert_eq!(
            result.content,
            "## Market Overview\nStocks rose.\n\n## Key Issues\n- Semiconductors"
        );
        assert_eq!(result.source_urls, vec!["https://a.example".to_string()]);
    }

    #[test]
    fn test_markers_in_reverse_order_still_parse() {
        // CONTENT comes first, so its body swallows the later lines verbatim.
        let raw = "CONTENT:\nBitcoin held $60k.\nSENTIMENT: NEGATIVE\nTITLE: Crypto steadies";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.title, "Crypto steadies");
        assert_eq!(result.market_sentiment, MarketSentiment::Negative);
        assert_eq!(
            result.content,
            "Bitcoin held $60k.\nSENTIMENT: NEGATIVE\nTITLE: Crypto steadies"
        );
    }

    #[test]
    fn test_no_markers_falls_back_to_defaults_and_raw_text() {
        let raw = "\n  The model ignored the format entirely.  \n";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.title, DEFAULT_TITLE);
        assert_eq!(result.market_sentiment, MarketSentiment::Neutral);
        assert_eq!(result.content, "The model ignored the format entirely.");
    }

    #[test]
    fn test_empty_reply_yields_empty_content() {
        let result = parse_response("", vec![]);
        assert_eq!(result.title, DEFAULT_TITLE);
        assert_eq!(result.market_sentiment, MarketSentiment::Neutral);
        assert_eq!(result.content, "");
    }

    #[test]
    fn test_lowercase_sentiment_is_neutral() {
        let result = parse_response("SENTIMENT: positive\nCONTENT:\nbody", vec![]);
        assert_eq!(result.market_sentiment, MarketSentiment::Neutral);
    }

    #[test]
    fn test_sentiment_with_trailing_words_is_not_matched() {
        let result = parse_response("SENTIMENT: POSITIVE overall", vec![]);
        assert_eq!(result.market_sentiment, MarketSentiment::Neutral);
    }

    #[test]
    fn test_first_valid_sentiment_line_wins() {
        let raw = "SENTIMENT: [POSITIVE or NEGATIVE]\nSENTIMENT: NEGATIVE\nSENTIMENT: POSITIVE";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.market_sentiment, MarketSentiment::Negative);
    }

    #[test]
    fn test_surrounding_chatter_is_tolerated() {
        let raw = "Sure! Here is your summary.\n\nTITLE:   Oil slips  \nSENTIMENT:NEGATIVE\r\nCONTENT:  \r\n## Market Overview\nWTI fell.\n";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.title, "Oil slips");
        assert_eq!(result.market_sentiment, MarketSentiment::Negative);
        assert_eq!(result.content, "## Market Overview\nWTI fell.");
    }

    #[test]
    fn test_content_marker_without_line_break_falls_back_to_raw_text() {
        let raw = "TITLE: Inline\nCONTENT: everything on one line";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.title, "Inline");
        assert_eq!(result.content, raw);
    }

    #[test]
    fn test_empty_content_block_falls_back_to_raw_text() {
        let raw = "TITLE: Nothing to say\nCONTENT:\n   ";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.content, raw.trim());
    }

    #[test]
    fn test_blank_title_uses_default() {
        let result = parse_response("TITLE:   \nCONTENT:\nbody", vec![]);
        assert_eq!(result.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_overlong_title_is_capped() {
        let raw = format!("TITLE: {}", "가".repeat(MAX_TITLE_CHARS + 50));
        let result = parse_response(&raw, vec![]);
        assert_eq!(result.title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_marker_inside_other_words_is_ignored() {
        let raw = "SUBTITLE: wrong one
TITLE: Gold steady
MARKET_SENTIMENT: NEGATIVE
SENTIMENT: POSITIVE
CONTENT:
body";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.title, "Gold steady");
        assert_eq!(result.market_sentiment, MarketSentiment::Positive);
        assert_eq!(result.content, "body");
    }

    #[test]
    fn test_echoed_instruction_line_is_not_a_marker() {
        let raw = "IMPORTANT: TITLE:, SENTIMENT: and CONTENT: must all be present
            TITLE: Bitcoin holds
            SENTIMENT: NEUTRAL
            CONTENT:
            ## Market Overview";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.title, "Bitcoin holds");
        assert_eq!(result.market_sentiment, MarketSentiment::Neutral);
        assert_eq!(result.content, "## Market Overview");
    }

    #[test]
    fn test_indented_markers_are_accepted() {
        let raw = "  TITLE: Rates hold
	SENTIMENT: NEGATIVE
  CONTENT:
body";
        let result = parse_response(raw, vec![]);
        assert_eq!(result.title, "Rates hold");
        assert_eq!(result.market_sentiment, MarketSentiment::Negative);
        assert_eq!(result.content, "body");
    }
}
