//! LLM configuration parsed from environment variables.

use super::types::LlmError;
use crate::config::{HttpTimeouts, env_parse, optional};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

const API_KEY_VAR: &str = "GOOGLE_AI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeouts: HttpTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Required:
    /// - `GOOGLE_AI_API_KEY`
    ///
    /// Optional:
    /// - `GEMINI_MODEL`: `gemini-1.5-flash` when absent
    /// - `GEMINI_BASE_URL`: default Generative Language API root
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` when the key is unset, or `ConfigParse` for a
    /// model name that cannot appear in a URL path.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = optional(API_KEY_VAR).ok_or_else(|| LlmError::MissingApiKey { var: API_KEY_VAR.into() })?;
        let model = parse_model(optional("GEMINI_MODEL").as_deref())?;
        let base_url = optional("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = HttpTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key, model, base_url, timeouts })
    }
}

fn parse_model(raw: Option<&str>) -> Result<String, LlmError> {
    let model = raw.unwrap_or(DEFAULT_GEMINI_MODEL);
    if model.contains(['/', '?', '#', ':', ' ']) {
        return Err(LlmError::ConfigParse(format!("invalid GEMINI_MODEL: {model}")));
    }
    Ok(model.to_string())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
