//! Gemini `generateContent` client.
//!
//! Thin HTTP wrapper for `{base}/models/{model}:generateContent`. Pure request
//! building and response parsing live in free functions for testability.

use serde::{Deserialize, Serialize};

use super::config::LlmConfig;
use super::types::LlmError;

const JSON_MIME_TYPE: &str = "application/json";

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the HTTP client cannot be constructed.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = config
            .timeouts
            .client()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/models/{}:generateContent", config.base_url, config.model),
            api_key: config.api_key.clone(),
        })
    }

    /// # Errors
    ///
    /// `RateLimited` on HTTP 429, `ApiResponse` on any other non-2xx status,
    /// `ApiRequest` on transport failure, `EmptyResponse` without candidate text.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request_body(prompt))
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        match status {
            200..=299 => parse_generate_response(&text),
            429 => Err(LlmError::RateLimited),
            _ => Err(LlmError::ApiResponse { status, body: text }),
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn build_request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: [RequestContent { parts: [RequestPart { text: prompt }] }],
        generation_config: GenerationConfig { response_mime_type: JSON_MIME_TYPE },
    }
}

/// Text of `candidates[0].content.parts[0]`.
fn parse_generate_response(json: &str) -> Result<String, LlmError> {
    let api: GenerateResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    api.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
