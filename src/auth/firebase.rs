//! Firebase Auth email/password provider (`accounts:signInWithPassword`).

use serde::{Deserialize, Serialize};

use super::{AuthError, AuthProvider, User};
use crate::config::BackendConfig;

/// Provider error codes that mean "wrong email or password".
const CREDENTIAL_ERRORS: &[&str] = &["INVALID_LOGIN_CREDENTIALS", "INVALID_PASSWORD", "EMAIL_NOT_FOUND", "INVALID_EMAIL"];

pub struct FirebaseAuth {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl FirebaseAuth {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        Ok(Self {
            http: config.timeouts.client()?,
            endpoint: format!("{}/accounts:signInWithPassword", config.auth_base_url),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl AuthProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let body = SignInRequest { email, password, return_secure_token: true };
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        if status != 200 {
            return Err(classify_error(status, &text));
        }
        parse_sign_in(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn parse_sign_in(json: &str) -> Result<User, AuthError> {
    let parsed: SignInResponse = serde_json::from_str(json).map_err(|e| AuthError::Parse(e.to_string()))?;
    Ok(User { uid: parsed.local_id, email: parsed.email, id_token: parsed.id_token })
}

fn classify_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    // Codes may carry a suffix, e.g. "INVALID_PASSWORD : ...".
    let code = message.split([' ', ':']).next().unwrap_or_default();
    if status == 400 && CREDENTIAL_ERRORS.contains(&code) {
        AuthError::InvalidCredentials
    } else {
        AuthError::Status { status, message }
    }
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
