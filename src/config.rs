//! Backend configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! One typed struct per collaborator family. Required values fail with a
//! `ConfigError` naming the variable; everything else falls back to a
//! `DEFAULT_*` constant so a bare `.env` with the three Firebase keys is
//! enough to run the catalog commands.

use std::time::Duration;

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0";
pub const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// HTTP timeouts shared by every REST client in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    /// Build a `reqwest` client honouring these timeouts.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn client(self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_secs))
            .connect_timeout(Duration::from_secs(self.connect_secs))
            .build()
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS }
    }
}

/// Connection settings for the hosted Firebase services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub api_key: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub firestore_base_url: String,
    pub storage_base_url: String,
    pub auth_base_url: String,
    pub poll_interval: Duration,
    pub timeouts: HttpTimeouts,
}

impl BackendConfig {
    /// Build typed backend config from environment variables.
    ///
    /// Required:
    /// - `FIREBASE_API_KEY`
    /// - `FIREBASE_PROJECT_ID`
    ///
    /// Optional:
    /// - `FIREBASE_STORAGE_BUCKET`: `{project}.appspot.com` when absent
    /// - `FIRESTORE_BASE_URL`, `FIREBASE_STORAGE_BASE_URL`, `FIREBASE_AUTH_BASE_URL`
    /// - `FIRESTORE_POLL_INTERVAL_MS`: default 1000
    /// - `BACKEND_REQUEST_TIMEOUT_SECS`: default 120
    /// - `BACKEND_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when a required variable is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = required("FIREBASE_API_KEY")?;
        let project_id = required("FIREBASE_PROJECT_ID")?;
        let storage_bucket =
            optional("FIREBASE_STORAGE_BUCKET").unwrap_or_else(|| format!("{project_id}.appspot.com"));

        Ok(Self {
            api_key,
            project_id,
            storage_bucket,
            firestore_base_url: base_url("FIRESTORE_BASE_URL", DEFAULT_FIRESTORE_BASE_URL),
            storage_base_url: base_url("FIREBASE_STORAGE_BASE_URL", DEFAULT_STORAGE_BASE_URL),
            auth_base_url: base_url("FIREBASE_AUTH_BASE_URL", DEFAULT_AUTH_BASE_URL),
            poll_interval: Duration::from_millis(env_parse("FIRESTORE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)),
            timeouts: HttpTimeouts {
                request_secs: env_parse("BACKEND_REQUEST_TIMEOUT_SECS", DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("BACKEND_CONNECT_TIMEOUT_SECS", DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS),
            },
        })
    }

    /// Root of the document tree for the configured project.
    #[must_use]
    pub fn documents_root(&self) -> String {
        format!("{}/projects/{}/databases/(default)/documents", self.firestore_base_url, self.project_id)
    }
}

/// View-layer settings for the catalog screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub page_size: usize,
    pub probe_interval: Duration,
}

impl ViewConfig {
    /// Read `CATALOG_PAGE_SIZE` and `CONNECTIVITY_PROBE_INTERVAL_SECS`.
    ///
    /// # Errors
    ///
    /// A page size of zero is rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let page_size = env_parse("CATALOG_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::Invalid { var: "CATALOG_PAGE_SIZE", value: "0".into() });
        }
        Ok(Self {
            page_size,
            probe_interval: Duration::from_secs(env_parse(
                "CONNECTIVITY_PROBE_INTERVAL_SECS",
                DEFAULT_PROBE_INTERVAL_SECS,
            )),
        })
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS) }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn base_url(key: &str, default: &str) -> String {
    optional(key)
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
