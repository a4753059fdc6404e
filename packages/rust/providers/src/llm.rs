//! Generative text capability and the Gemini adapter.

use std::time::Duration;

use async_trait::async_trait;
use outreach_shared::{OutreachError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::http::{build_client, ensure_success, network_error, read_json};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A single prompt plus sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

impl TextRequest {
    /// Open-ended generation (phrase extraction, category brainstorming).
    pub fn creative(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: Some(0.7),
            top_p: None,
            top_k: None,
            max_output_tokens: None,
        }
    }

    /// Near-deterministic generation for structured or templated output.
    pub fn precise(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: Some(0.1),
            top_p: Some(0.95),
            top_k: Some(40),
            max_output_tokens: Some(1024),
        }
    }
}

/// Produces text, or schema-shaped JSON, from a prompt.
#[async_trait]
pub trait GenerativeTextProvider: Send + Sync {
    /// Free-form completion.
    async fn complete(&self, request: &TextRequest) -> Result<String>;

    /// Completion constrained to the given JSON schema.
    async fn complete_json(&self, request: &TextRequest, schema: &Value) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Google Gemini `generateContent` client.
pub struct GeminiText {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiText {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    async fn generate(&self, body: &GenerateRequest<'_>) -> Result<String> {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(&endpoint, e))?;

        let response = ensure_success(&endpoint, response).await?;
        let parsed: GenerateResponse = read_json(&endpoint, response).await?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OutreachError::parse(format!(
                "{endpoint}: response contained no candidate text"
            )));
        }

        debug!(chars = text.len(), "generation complete");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

impl<'a> GenerateRequest<'a> {
    fn new(request: &'a TextRequest, schema: Option<&'a Value>) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                top_k: request.top_k,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: schema.map(|_| "application/json"),
                response_schema: schema,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl GenerativeTextProvider for GeminiText {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &TextRequest) -> Result<String> {
        self.generate(&GenerateRequest::new(request, None)).await
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete_json(&self, request: &TextRequest, schema: &Value) -> Result<Value> {
        let text = self
            .generate(&GenerateRequest::new(request, Some(schema)))
            .await?;
        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| OutreachError::parse(format!("model returned invalid JSON: {e}")))
    }
}

/// Drop a surrounding Markdown code fence if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
