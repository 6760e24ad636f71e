//! LLM types — the generation seam and its errors.

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by generative-text client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the provider failed (network, timeout, TLS).
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider is throttling this key (HTTP 429).
    #[error("API rate limit reached")]
    RateLimited,

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The response carried no candidate text.
    #[error("API returned no candidate text")]
    EmptyResponse,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// GENERATIVE TEXT TRAIT
// =============================================================================

/// Single-shot text generation constrained to JSON output. Enables mocking in tests.
#[async_trait::async_trait]
pub trait GenerativeText: Send + Sync {
    /// Send `prompt` and return the raw text of the first candidate.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::RateLimited`] on HTTP 429, [`LlmError::EmptyResponse`]
    /// when no candidate text came back, and other variants for transport or
    /// status failures.
    async fn generate_json(&self, prompt: &str) -> Result<String, LlmError>;
}
