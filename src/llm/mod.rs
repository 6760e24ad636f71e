//! LLM — generative-text adapter for the category-extraction chat.
//!
//! DESIGN
//! ======
//! Configured from environment variables. The chat flow only ever sees the
//! [`GenerativeText`] trait, so tests swap in a scripted mock and the HTTP
//! client stays a thin wrapper around one endpoint.

pub mod config;
pub mod gemini;
pub mod types;

use config::LlmConfig;
pub use gemini::GeminiClient;
pub use types::{GenerativeText, LlmError};

impl GeminiClient {
    /// Build a client from environment variables.
    ///
    /// - `GOOGLE_AI_API_KEY`: API key (required)
    /// - `GEMINI_MODEL`: model name (e.g. `"gemini-1.5-flash"`)
    /// - `GEMINI_BASE_URL`: custom API root
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::new(&config)
    }
}

#[async_trait::async_trait]
impl GenerativeText for GeminiClient {
    async fn generate_json(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate(prompt).await
    }
}
