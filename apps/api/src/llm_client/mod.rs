/// LLM Client — the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the provider directly.
/// The summary pipeline depends on the `GenerationClient` trait only.
///
/// One request per call, search grounding always on, no retry. Callers bound
/// the call with their own timeout.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::GeminiConfig;

/// The key travels in a header, never in the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Gemini API error{}: {message}", status_suffix(.code))]
    Provider { code: Option<i32>, message: String },

    /// Carries no request URL; see the `From` impl.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Failed to decode Gemini response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Transport errors end up in stored failure text, so the URL is stripped.
impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Http(e.without_url())
    }
}

fn status_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" {c}")).unwrap_or_default()
}

/// Text and grounding citations returned by one generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedResponse {
    pub text: String,
    pub source_urls: Vec<String>,
}

/// A grounded text generator. Carried as `Arc<dyn GenerationClient>` so the
/// pipeline can run against a fake provider in tests.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GroundedResponse, GenerationError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Enables Google Search grounding. Serializes as `{"google_search": {}}`.
#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

impl<'a> GenerateContentRequest<'a> {
    fn grounded(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub error: Option<ProviderErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebChunk {
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub code: Option<i32>,
    pub message: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, or empty.
    pub fn text(&self) -> &str {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .unwrap_or("")
    }

    /// Web citations of the first candidate, in provider order.
    pub fn source_urls(&self) -> Vec<String> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| {
                m.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref()?.uri.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        )
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GroundedResponse, GenerationError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateContentRequest::grounded(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Gemini reports failures as an `error` object, usually with a non-2xx status.
        let parsed = match serde_json::from_str::<GenerateContentResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(GenerationError::Provider {
                    code: Some(i32::from(status.as_u16())),
                    message: body,
                })
            }
            Err(e) => return Err(GenerationError::Decode(e)),
        };

        if let Some(error) = parsed.error.as_ref() {
            return Err(GenerationError::Provider {
                code: error.code,
                message: error
                    .message
                    .clone()
                    .unwrap_or_else(|| "no message".to_string()),
            });
        }

        if !status.is_success() {
            return Err(GenerationError::Provider {
                code: Some(i32::from(status.as_u16())),
                message: body,
            });
        }

        let grounded = GroundedResponse {
            text: parsed.text().to_string(),
            source_urls: parsed.source_urls(),
        };

        debug!(
            "Gemini call succeeded: {} chars, {} sources",
            grounded.text.len(),
            grounded.source_urls.len()
        );

        Ok(grounded)
    }
}
