//! Generic list controller: load, search, page, and auth-gated mutations.

use std::sync::Arc;

use tracing::{error, info};

use super::{CatalogRecord, Draft};
use crate::auth::SessionContext;
use crate::backend::{Collection, DocumentStore, StoreError};
use crate::listing::ListView;
use crate::mutation::{
    MutationError, MutationKind, MutationOrchestrator, RemoteError, load_failure_message, not_selected_message,
};

pub struct CatalogController<T> {
    collection: Collection<T>,
    session: SessionContext,
    records: Vec<T>,
    view: ListView,
    orchestrator: MutationOrchestrator,
    notice: Option<String>,
}

impl<T: CatalogRecord> CatalogController<T> {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionContext, page_size: usize) -> Self {
        Self {
            collection: Collection::new(store),
            session,
            records: Vec::new(),
            view: ListView::new(page_size),
            orchestrator: MutationOrchestrator::new(T::NOUN),
            notice: None,
        }
    }

    /// Fetch the whole collection, replacing local state.
    ///
    /// # Errors
    ///
    /// Propagates the store error; the previous records are kept and the
    /// load-failure notice is set.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        match self.collection.list_all().await {
            Ok(records) => {
                info!(collection = T::COLLECTION, count = records.len(), "catalog: loaded");
                self.records = records;
                self.notice = None;
                Ok(())
            }
            Err(e) => {
                error!(collection = T::COLLECTION, error = %e, "catalog: load failed");
                self.notice = Some(load_failure_message(&T::NOUN));
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Look up a loaded record by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    #[must_use]
    pub fn view(&self) -> &ListView {
        &self.view
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.view.set_term(term);
    }

    pub fn set_page(&mut self, page: usize) {
        self.view.set_page(page);
    }

    /// Every record matching the search term, across pages.
    #[must_use]
    pub fn filtered(&self) -> Vec<&T> {
        self.view.filtered(&self.records)
    }

    /// Records on the current page of the filtered list.
    #[must_use]
    pub fn visible(&self) -> Vec<&T> {
        self.view.visible(&self.records)
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.view.page_count(&self.records)
    }

    /// Last load failure, if the most recent fetch did not succeed.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn orchestrator(&self) -> &MutationOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Store a new record and reload. Returns the assigned id.
    ///
    /// # Errors
    ///
    /// `AuthorizationRequired` without a session, `Validation` for missing or
    /// invalid fields (no remote call in either case), `Remote` when the write fails.
    pub async fn create(&mut self, draft: impl Draft<T>) -> Result<String, MutationError> {
        let record = self.admit(MutationKind::Create, draft)?;
        self.orchestrator.begin(MutationKind::Create);
        let id = match self.collection.create(&record).await {
            Ok(id) => id,
            Err(e) => return Err(self.orchestrator.fail(MutationKind::Create, e)),
        };
        self.settle(MutationKind::Create).await;
        Ok(id)
    }

    /// Overwrite an existing record's fields and reload.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create); a draft without an id is a validation failure.
    pub async fn update(&mut self, draft: impl Draft<T>) -> Result<(), MutationError> {
        let record = self.admit(MutationKind::Update, draft)?;
        self.orchestrator.begin(MutationKind::Update);
        if let Err(e) = self.collection.update(&record).await {
            return Err(self.orchestrator.fail(MutationKind::Update, e));
        }
        self.settle(MutationKind::Update).await;
        Ok(())
    }

    /// Delete a record by id and reload.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create); an empty id is a validation failure.
    pub async fn delete(&mut self, id: &str) -> Result<(), MutationError> {
        self.admit_delete(id)?;
        self.orchestrator.begin(MutationKind::Delete);
        if let Err(e) = self.collection.delete(id).await {
            return Err(self.orchestrator.fail(MutationKind::Delete, e));
        }
        self.settle(MutationKind::Delete).await;
        Ok(())
    }

    // =========================================================================
    // STEPS (shared with BookController)
    // =========================================================================

    /// Authorize, check the selection and validate. No remote call is made.
    pub(crate) fn admit(&mut self, kind: MutationKind, draft: impl Draft<T>) -> Result<T, MutationError> {
        self.orchestrator.authorize(kind, &self.session)?;
        if kind != MutationKind::Create && draft.target_id().trim().is_empty() {
            return Err(self
                .orchestrator
                .reject(kind, not_selected_message(kind, &T::NOUN)));
        }
        draft
            .into_record()
            .map_err(|message| self.orchestrator.reject(kind, message))
    }

    pub(crate) fn admit_delete(&mut self, id: &str) -> Result<(), MutationError> {
        self.orchestrator
            .authorize(MutationKind::Delete, &self.session)?;
        if id.trim().is_empty() {
            return Err(self.orchestrator.reject(
                MutationKind::Delete,
                not_selected_message(MutationKind::Delete, &T::NOUN),
            ));
        }
        Ok(())
    }

    pub(crate) fn reject(&mut self, kind: MutationKind, message: &str) -> MutationError {
        self.orchestrator.reject(kind, message)
    }

    pub(crate) fn begin(&mut self, kind: MutationKind) {
        self.orchestrator.begin(kind);
    }

    pub(crate) fn fail(&mut self, kind: MutationKind, source: impl Into<RemoteError>) -> MutationError {
        self.orchestrator.fail(kind, source)
    }

    pub(crate) fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    /// Reload after a successful write. A failed reload keeps the stale list
    /// and leaves the load-failure notice; the write itself still succeeded.
    pub(crate) async fn settle(&mut self, kind: MutationKind) {
        self.orchestrator.reload(kind);
        let _ = self.load().await;
        self.orchestrator.finish(kind);
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
