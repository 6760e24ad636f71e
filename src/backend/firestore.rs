//! Firestore REST gateway.
//!
//! DESIGN
//! ======
//! Documents travel as typed value maps (`{"precio": {"doubleValue": 12.5}}`).
//! The codec below converts those to plain JSON fields and back; the top-level
//! `timestamp` field is written as a `timestampValue` so ordered queries sort
//! chronologically rather than lexically.
//!
//! Requests carry the signed-in user's ID token when there is one, so the
//! project's security rules see the same identity the session reports.
//!
//! TRADE-OFFS
//! ==========
//! The REST surface has no push listener, so `subscribe` polls an ordered
//! `runQuery` and only emits when the snapshot actually changed.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{Map, Number, Value, json};
use tracing::{debug, warn};

use super::{Document, DocumentStore, Fields, Snapshot, StoreError};
use crate::auth::SessionContext;
use crate::config::BackendConfig;

const LIST_PAGE_SIZE: &str = "300";

/// Top-level fields stored as Firestore timestamps.
pub const TIMESTAMP_FIELDS: &[&str] = &["timestamp"];

pub struct FirestoreStore {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    root: String,
    api_key: String,
    session: SessionContext,
    poll_interval: Duration,
}

impl FirestoreStore {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig, session: SessionContext) -> Result<Self, StoreError> {
        let http = config.timeouts.client()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                root: config.documents_root(),
                api_key: config.api_key.clone(),
                session,
                poll_interval: config.poll_interval,
            }),
        })
    }
}

impl Inner {
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .http
            .request(method, url)
            .query(&[("key", self.api_key.as_str())]);
        match self.session.id_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(StoreError::Status { status, body: text });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn run_ordered_query(&self, collection: &str, order_by: &str) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.root);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "orderBy": [{ "field": { "fieldPath": order_by }, "direction": "ASCENDING" }],
            }
        });
        let value = self
            .send(self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        parse_query_results(&value)
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/{collection}", self.inner.root);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .inner
                .request(reqwest::Method::GET, &url)
                .query(&[("pageSize", LIST_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let value = self.inner.send(request).await?;
            if let Some(items) = value.get("documents").and_then(Value::as_array) {
                for item in items {
                    documents.push(parse_document(item)?);
                }
            }
            page_token = value
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(ToOwned::to_owned);
            if page_token.is_none() {
                break;
            }
        }
        debug!(collection, count = documents.len(), "firestore: listed collection");
        Ok(documents)
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let url = format!("{}/{collection}", self.inner.root);
        let body = json!({ "fields": encode_fields(&fields) });
        let value = self
            .inner
            .send(self.inner.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        let document = parse_document(&value)?;
        Ok(document.id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let url = format!("{}/{collection}/{id}", self.inner.root);
        let mask: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        let body = json!({ "fields": encode_fields(&fields) });
        let request = self
            .inner
            .request(reqwest::Method::PATCH, &url)
            .query(&[("currentDocument.exists", "true")])
            .query(&mask)
            .json(&body);
        self.inner
            .send(request)
            .await
            .map(|_| ())
            .map_err(|e| not_found_as(e, collection, id))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = format!("{}/{collection}/{id}", self.inner.root);
        self.inner
            .send(self.inner.request(reqwest::Method::DELETE, &url))
            .await
            .map(|_| ())
            .map_err(|e| not_found_as(e, collection, id))
    }

    fn subscribe(&self, collection: &str, order_by: &str) -> Snapshot<Document> {
        let state = PollState {
            inner: Arc::clone(&self.inner),
            collection: collection.to_string(),
            order_by: order_by.to_string(),
            last: None,
            primed: false,
        };
        futures::stream::unfold(state, |mut state| async move {
            loop {
                if state.primed {
                    tokio::time::sleep(state.inner.poll_interval).await;
                }
                state.primed = true;
                match state
                    .inner
                    .run_ordered_query(&state.collection, &state.order_by)
                    .await
                {
                    Ok(documents) => {
                        if state.last.as_ref() == Some(&documents) {
                            continue;
                        }
                        state.last = Some(documents.clone());
                        return Some((Ok(documents), state));
                    }
                    Err(e) => {
                        warn!(collection = %state.collection, error = %e, "firestore: snapshot poll failed");
                        state.last = None;
                        return Some((Err(e), state));
                    }
                }
            }
        })
        .boxed()
    }
}

struct PollState {
    inner: Arc<Inner>,
    collection: String,
    order_by: String,
    last: Option<Vec<Document>>,
    primed: bool,
}

fn not_found_as(error: StoreError, collection: &str, id: &str) -> StoreError {
    match error {
        StoreError::Status { status: 404, .. } => {
            StoreError::NotFound { collection: collection.to_string(), id: id.to_string() }
        }
        other => other,
    }
}

// =============================================================================
// VALUE CODEC
// =============================================================================

/// Plain JSON fields → Firestore typed value map.
#[must_use]
pub fn encode_fields(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| {
            let typed = match value {
                Value::String(s) if TIMESTAMP_FIELDS.contains(&key.as_str()) && is_rfc3339(s) => {
                    json!({ "timestampValue": s })
                }
                other => encode_value(other),
            };
            (key.clone(), typed)
        })
        .collect();
    Value::Object(encoded)
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Firestore typed value map → plain JSON fields.
///
/// # Errors
///
/// Returns `Decode` for values that are not a single typed entry.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, StoreError> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Err(StoreError::Decode(format!("untyped value: {value}")));
    };
    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or_default())),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::Decode(format!("bad integerValue: {inner}")))
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| StoreError::Decode(format!("bad doubleValue: {inner}"))),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let fields = match inner.get("fields").and_then(Value::as_object) {
                Some(fields) => decode_fields(fields)?,
                None => Map::new(),
            };
            Ok(Value::Object(fields))
        }
        "geoPointValue" => Ok(inner.clone()),
        other => Err(StoreError::Decode(format!("unsupported value type: {other}"))),
    }
}

/// Parse one REST document (`{"name": ".../documents/col/ID", "fields": {...}}`).
///
/// # Errors
///
/// Returns `Decode` when the name is missing or a field cannot be decoded.
pub fn parse_document(value: &Value) -> Result<Document, StoreError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decode("document without name".into()))?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();
    let fields = match value.get("fields").and_then(Value::as_object) {
        Some(fields) => decode_fields(fields)?,
        None => Map::new(),
    };
    Ok(Document { id, fields })
}

/// Parse a `runQuery` response: an array of `{document?, readTime}` entries.
///
/// # Errors
///
/// Returns `Decode` when the body is not an array or a document is malformed.
pub fn parse_query_results(value: &Value) -> Result<Vec<Document>, StoreError> {
    let Some(entries) = value.as_array() else {
        return Err(StoreError::Decode(format!("runQuery returned non-array: {value}")));
    };
    entries
        .iter()
        .filter_map(|entry| entry.get("document"))
        .map(parse_document)
        .collect()
}

fn is_rfc3339(raw: &str) -> bool {
    time::OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339).is_ok()
}

#[cfg(test)]
#[path = "firestore_test.rs"]
mod tests;
