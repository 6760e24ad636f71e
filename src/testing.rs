//! Test doubles shared by the unit tests.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;

use crate::auth::{AuthError, AuthProvider, SessionContext, User};
use crate::backend::{
    Document, DocumentStore, Fields, ObjectStorage, Record, Snapshot, StorageError, StoreError, encode,
};
use crate::llm::{GenerativeText, LlmError};

/// Serializes tests that touch process environment variables.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn admin() -> User {
    User { uid: "uid-admin".into(), email: "admin@ferreteria.ni".into(), id_token: "tok-admin".into() }
}

pub(crate) fn signed_in() -> SessionContext {
    SessionContext::signed_in(admin())
}

// =============================================================================
// AUTH
// =============================================================================

pub(crate) struct StaticAuth {
    user: Option<User>,
}

impl StaticAuth {
    pub(crate) fn accepting(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub(crate) fn rejecting() -> Self {
        Self { user: None }
    }
}

#[async_trait::async_trait]
impl AuthProvider for StaticAuth {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<User, AuthError> {
        self.user.clone().ok_or(AuthError::InvalidCredentials)
    }
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

type Tables = Arc<Mutex<HashMap<String, Vec<Document>>>>;

/// In-memory document store with call counters, failure injection and a
/// push subscription that re-emits after every write.
pub(crate) struct MemoryStore {
    tables: Tables,
    version: watch::Sender<u64>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    write_calls: AtomicUsize,
    fail_writes: AtomicBool,
    fail_lists: AtomicBool,
    fail_collection: Mutex<Option<String>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        let (version, _rx) = watch::channel(0);
        Arc::new(Self {
            tables: Arc::default(),
            version,
            next_id: AtomicUsize::new(1),
            list_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            fail_collection: Mutex::new(None),
        })
    }

    /// Insert `record` directly, bypassing counters. Returns its id.
    pub(crate) fn seed<T: Record>(&self, record: &T) -> String {
        let id = self.fresh_id();
        let fields = encode(record).unwrap();
        locked(&self.tables)
            .entry(T::COLLECTION.to_string())
            .or_default()
            .push(Document { id: id.clone(), fields });
        self.bump();
        id
    }

    /// Insert raw fields as another client could have written them.
    pub(crate) fn seed_fields(&self, collection: &str, fields: Value) -> String {
        let id = self.fresh_id();
        let Value::Object(fields) = fields else {
            panic!("document fields must be an object");
        };
        locked(&self.tables)
            .entry(collection.to_string())
            .or_default()
            .push(Document { id: id.clone(), fields });
        self.bump();
        id
    }

    pub(crate) fn records<T: Record>(&self) -> Vec<T> {
        self.documents(T::COLLECTION)
            .into_iter()
            .map(|d| crate::backend::decode(d).unwrap())
            .collect()
    }

    pub(crate) fn documents(&self, collection: &str) -> Vec<Document> {
        locked(&self.tables)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Remote calls made through the trait (lists plus writes).
    pub(crate) fn calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst) + self.write_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_lists(&self, on: bool) {
        self.fail_lists.store(on, Ordering::SeqCst);
    }

    /// Fail writes to one collection only.
    pub(crate) fn fail_writes_to(&self, collection: &str) {
        *locked(&self.fail_collection) = Some(collection.to_string());
    }

    fn fresh_id(&self) -> String {
        format!("doc-{}-{}", self.next_id.fetch_add(1, Ordering::SeqCst), uuid::Uuid::new_v4().simple())
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn check_write(&self, collection: &str) -> Result<(), StoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let blocked = locked(&self.fail_collection).as_deref() == Some(collection);
        if blocked || self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Status { status: 503, body: "unavailable".into() });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Request("connection refused".into()));
        }
        Ok(self.documents(collection))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.check_write(collection)?;
        let id = self.fresh_id();
        locked(&self.tables)
            .entry(collection.to_string())
            .or_default()
            .push(Document { id: id.clone(), fields });
        self.bump();
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.check_write(collection)?;
        {
            let mut tables = locked(&self.tables);
            let document = tables
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| StoreError::NotFound { collection: collection.into(), id: id.into() })?;
            document.fields.extend(fields);
        }
        self.bump();
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_write(collection)?;
        if let Some(docs) = locked(&self.tables).get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        self.bump();
        Ok(())
    }

    fn subscribe(&self, collection: &str, order_by: &str) -> Snapshot<Document> {
        let state =
            (self.version.subscribe(), Arc::clone(&self.tables), collection.to_string(), order_by.to_string(), true);
        futures::stream::unfold(state, |(mut rx, tables, collection, order_by, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            let mut docs = locked(&tables).get(&collection).cloned().unwrap_or_default();
            docs.sort_by(|a, b| compare_field(a.fields.get(&order_by), b.fields.get(&order_by)));
            Some((Ok(docs), (rx, tables, collection, order_by, false)))
        })
        .boxed()
    }
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(ToOwned::to_owned);
    match (text(a), text(b)) {
        (Some(a), Some(b)) => match (OffsetDateTime::parse(&a, &Rfc3339), OffsetDateTime::parse(&b, &Rfc3339)) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => a.cmp(&b),
        },
        _ => CmpOrdering::Equal,
    }
}

// =============================================================================
// OBJECT STORAGE
// =============================================================================

pub(crate) const MEMORY_URL_PREFIX: &str = "memory://";

pub(crate) struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryStorage {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::default(),
            uploads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_uploads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        })
    }

    pub(crate) fn url_for(path: &str) -> String {
        format!("{MEMORY_URL_PREFIX}{path}")
    }

    pub(crate) fn put(&self, path: &str, bytes: &[u8]) {
        locked(&self.objects).insert(path.to_string(), bytes.to_vec());
    }

    pub(crate) fn contains(&self, path: &str) -> bool {
        locked(&self.objects).contains_key(path)
    }

    pub(crate) fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub(crate) fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_uploads(&self, on: bool) {
        self.fail_uploads.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_deletes(&self, on: bool) {
        self.fail_deletes.store(on, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Status { status: 503, body: "unavailable".into() });
        }
        locked(&self.objects).insert(path.to_string(), bytes);
        Ok(())
    }

    async fn access_url(&self, path: &str) -> Result<String, StorageError> {
        if self.contains(path) {
            Ok(Self::url_for(path))
        } else {
            Err(StorageError::NotFound(path.to_string()))
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Status { status: 500, body: "storage down".into() });
        }
        locked(&self.objects)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(MEMORY_URL_PREFIX).map(ToOwned::to_owned)
    }
}

// =============================================================================
// GENERATIVE TEXT
// =============================================================================

/// Scripted generative client: replays queued results in order.
pub(crate) struct MockLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub(crate) fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), prompts: Mutex::default() })
    }

    pub(crate) fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        locked(&self.prompts).clone()
    }
}

#[async_trait::async_trait]
impl GenerativeText for MockLlm {
    async fn generate_json(&self, prompt: &str) -> Result<String, LlmError> {
        locked(&self.prompts).push(prompt.to_string());
        locked(&self.replies)
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}
