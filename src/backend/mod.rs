//! Backend gateways — hosted document collections and binary storage.
//!
//! ARCHITECTURE
//! ============
//! `DocumentStore` and `ObjectStorage` are the seams to the hosted services.
//! Controllers never see the REST wire format: they work with typed
//! [`Collection`] handles that serialize records into plain JSON field maps
//! and attach the service-assigned document id on the way back.
//!
//! Live collections are exposed as a [`Snapshot`] stream. Each item is the
//! entire ordered collection; dropping the stream cancels the subscription.

pub mod firestore;
pub mod storage;

use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::{Book, Category, ChatMessage, Product};

/// Raw field map of a stored document.
pub type Fields = Map<String, Value>;

/// Stream of full collection snapshots.
pub type Snapshot<T> = BoxStream<'static, Result<Vec<T>, StoreError>>;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("malformed document: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("storage returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object has no download token: {0}")]
    MissingToken(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

// =============================================================================
// GATEWAY TRAITS
// =============================================================================

/// A stored document: service-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Named record collections on a hosted document service.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`, in service order.
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Store a new document and return the id the service assigned.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Live view of `collection` ordered ascending by `order_by`.
    fn subscribe(&self, collection: &str, order_by: &str) -> Snapshot<Document>;
}

/// Hosted binary object storage.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Public access URL for an uploaded object.
    async fn access_url(&self, path: &str) -> Result<String, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Recover the object path from an access URL previously returned by
    /// [`ObjectStorage::access_url`].
    fn path_from_url(&self, url: &str) -> Option<String>;
}

// =============================================================================
// TYPED COLLECTIONS
// =============================================================================

/// A record type bound to a named collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

macro_rules! impl_record {
    ($ty:ty, $collection:literal) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

impl_record!(Category, "categorias");
impl_record!(Product, "productos");
impl_record!(Book, "Libros");
impl_record!(ChatMessage, "chat");

/// Typed handle over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), _record: PhantomData }
    }
}

impl<T: Record> Collection<T> {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, _record: PhantomData }
    }

    /// # Errors
    ///
    /// Propagates the store error, or `Decode` when a document does not fit `T`.
    pub async fn list_all(&self) -> Result<Vec<T>, StoreError> {
        let documents = self.store.list_all(T::COLLECTION).await?;
        documents.into_iter().map(decode).collect()
    }

    /// # Errors
    ///
    /// Propagates the store error.
    pub async fn create(&self, record: &T) -> Result<String, StoreError> {
        self.store.create(T::COLLECTION, encode(record)?).await
    }

    /// # Errors
    ///
    /// Propagates the store error.
    pub async fn update(&self, record: &T) -> Result<(), StoreError> {
        self.store
            .update(T::COLLECTION, record.id(), encode(record)?)
            .await
    }

    /// # Errors
    ///
    /// Propagates the store error.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }

    #[must_use]
    pub fn subscribe(&self, order_by: &str) -> Snapshot<T> {
        self.store
            .subscribe(T::COLLECTION, order_by)
            .map(|snapshot| snapshot.and_then(|docs| docs.into_iter().map(decode).collect()))
            .boxed()
    }
}

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::Decode(format!("record is not an object: {other}"))),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

pub(crate) fn decode<T: Record>(document: Document) -> Result<T, StoreError> {
    let mut record: T = serde_json::from_value(Value::Object(document.fields))
        .map_err(|e| StoreError::Decode(format!("{}/{}: {e}", T::COLLECTION, document.id)))?;
    record.set_id(document.id);
    Ok(record)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
