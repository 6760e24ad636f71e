//! Firebase Storage REST gateway.
//!
//! Objects are addressed as `{base}/b/{bucket}/o/{url-encoded path}`. The
//! public access URL is the media URL carrying the object's first download
//! token, which is what the book records store in `pdfUrl`.

use serde_json::Value;
use tracing::debug;

use super::{ObjectStorage, StorageError};
use crate::auth::SessionContext;
use crate::config::BackendConfig;

pub struct FirebaseStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    session: SessionContext,
}

impl FirebaseStorage {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig, session: SessionContext) -> Result<Self, StorageError> {
        Ok(Self {
            http: config.timeouts.client()?,
            base_url: config.storage_base_url.clone(),
            bucket: config.storage_bucket.clone(),
            session,
        })
    }

    fn bucket_url(&self) -> String {
        format!("{}/b/{}/o", self.base_url, self.bucket)
    }

    fn object_url(&self, path: &str) -> String {
        object_url(&self.base_url, &self.bucket, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.id_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<String, StorageError> {
        let response = self.authorized(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        match status {
            200..=299 => Ok(body),
            404 => Err(StorageError::NotFound(path.to_string())),
            _ => Err(StorageError::Status { status, body }),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStorage for FirebaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let size = bytes.len();
        let request = self
            .http
            .post(self.bucket_url())
            .query(&[("name", path)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(request, path).await?;
        debug!(path, size, "storage: uploaded object");
        Ok(())
    }

    async fn access_url(&self, path: &str) -> Result<String, StorageError> {
        let body = self.send(self.http.get(self.object_url(path)), path).await?;
        let metadata: Value = serde_json::from_str(&body).map_err(|e| StorageError::Request(e.to_string()))?;
        let token = download_token(&metadata).ok_or_else(|| StorageError::MissingToken(path.to_string()))?;
        Ok(format!("{}?alt=media&token={token}", self.object_url(path)))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.send(self.http.delete(self.object_url(path)), path)
            .await
            .map(|_| ())
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        path_from_media_url(url)
    }
}

fn object_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!("{base_url}/b/{bucket}/o/{}", urlencoding::encode(path))
}

/// First entry of the comma-separated `downloadTokens` metadata field.
fn download_token(metadata: &Value) -> Option<&str> {
    metadata
        .get("downloadTokens")
        .and_then(Value::as_str)
        .and_then(|tokens| tokens.split(',').next())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Object path encoded in a media URL (`.../o/libros%2Fmanual.pdf?alt=media&token=...`).
#[must_use]
pub fn path_from_media_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/o/")?;
    let encoded = rest.split(['?', '#']).next()?;
    if encoded.is_empty() {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|p| p.into_owned())
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
