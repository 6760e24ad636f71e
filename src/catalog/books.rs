//! Book list controller: record writes with an attached PDF in object storage.
//!
//! The PDF is uploaded first and its access URL embedded in the record.
//! Removing an old PDF (on delete, or on update with a replacement) is best
//! effort: a storage failure is logged and the record write goes ahead. There
//! is no rollback, so a PDF uploaded for a record write that then fails is
//! left orphaned in storage.

use std::sync::Arc;

use tracing::{error, warn};

use super::controller::CatalogController;
use super::{FILL_FIELDS_AND_PDF, SELECT_PDF};
use crate::auth::SessionContext;
use crate::backend::{DocumentStore, ObjectStorage, StorageError};
use crate::models::{Book, PdfUpload};
use crate::mutation::{MutationError, MutationKind};

pub struct BookController {
    inner: CatalogController<Book>,
    storage: Arc<dyn ObjectStorage>,
}

impl BookController {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        session: SessionContext,
        page_size: usize,
    ) -> Self {
        Self { inner: CatalogController::new(store, session, page_size), storage }
    }

    /// The list side: load, search, paging, notices.
    #[must_use]
    pub fn list(&self) -> &CatalogController<Book> {
        &self.inner
    }

    pub fn list_mut(&mut self) -> &mut CatalogController<Book> {
        &mut self.inner
    }

    /// Upload `pdf`, then store `book` pointing at it.
    ///
    /// # Errors
    ///
    /// `AuthorizationRequired` or `Validation` (a PDF is mandatory) before any
    /// remote call; `Remote` when the upload or the record write fails.
    pub async fn create(&mut self, book: Book, pdf: Option<PdfUpload>) -> Result<String, MutationError> {
        let kind = MutationKind::Create;
        let mut book = self
            .inner
            .admit(kind, book)
            .map_err(|e| match e {
                MutationError::Validation(_) => MutationError::Validation(FILL_FIELDS_AND_PDF.into()),
                other => other,
            })?;
        let Some(pdf) = pdf else {
            return Err(self.inner.reject(kind, FILL_FIELDS_AND_PDF));
        };
        if !pdf.is_pdf() {
            return Err(self.inner.reject(kind, SELECT_PDF));
        }

        self.inner.begin(kind);
        book.pdf_url = match self.store_pdf(&pdf).await {
            Ok(url) => url,
            Err(e) => return Err(self.inner.fail(kind, e)),
        };
        let id = match self.inner.collection().create(&book).await {
            Ok(id) => id,
            Err(e) => {
                error!(url = %book.pdf_url, "books: record write failed; uploaded PDF left orphaned");
                return Err(self.inner.fail(kind, e));
            }
        };
        self.inner.settle(kind).await;
        Ok(id)
    }

    /// Update `book`'s fields. With a new `pdf`, the old file is removed
    /// best effort and the new one uploaded before the record write.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create); the PDF is optional here.
    pub async fn update(&mut self, book: Book, pdf: Option<PdfUpload>) -> Result<(), MutationError> {
        let kind = MutationKind::Update;
        let mut book = self.inner.admit(kind, book)?;
        if pdf.as_ref().is_some_and(|p| !p.is_pdf()) {
            return Err(self.inner.reject(kind, SELECT_PDF));
        }

        self.inner.begin(kind);
        if let Some(pdf) = pdf {
            self.discard_pdf(&book.pdf_url).await;
            book.pdf_url = match self.store_pdf(&pdf).await {
                Ok(url) => url,
                Err(e) => return Err(self.inner.fail(kind, e)),
            };
        }
        if let Err(e) = self.inner.collection().update(&book).await {
            return Err(self.inner.fail(kind, e));
        }
        self.inner.settle(kind).await;
        Ok(())
    }

    /// Delete the book record; its PDF is removed best effort first.
    ///
    /// # Errors
    ///
    /// `AuthorizationRequired`, `Validation` for an empty id, or `Remote`
    /// when the record delete fails. Storage failures never surface.
    pub async fn delete(&mut self, id: &str) -> Result<(), MutationError> {
        let kind = MutationKind::Delete;
        self.inner.admit_delete(id)?;
        let pdf_url = self.inner.find(id).map(|b| b.pdf_url.clone());

        self.inner.begin(kind);
        if let Some(url) = pdf_url {
            self.discard_pdf(&url).await;
        }
        if let Err(e) = self.inner.collection().delete(id).await {
            return Err(self.inner.fail(kind, e));
        }
        self.inner.settle(kind).await;
        Ok(())
    }

    async fn store_pdf(&self, pdf: &PdfUpload) -> Result<String, StorageError> {
        let path = pdf.storage_path();
        self.storage
            .upload(&path, pdf.bytes.clone(), PdfUpload::CONTENT_TYPE)
            .await?;
        self.storage.access_url(&path).await
    }

    async fn discard_pdf(&self, url: &str) {
        if url.trim().is_empty() {
            return;
        }
        let Some(path) = self.storage.path_from_url(url) else {
            warn!(url, "books: PDF url not recognised; skipping delete");
            return;
        };
        if let Err(e) = self.storage.delete(&path).await {
            warn!(path = %path, error = %e, "books: failed to delete PDF from storage");
        }
    }
}

#[cfg(test)]
#[path = "books_test.rs"]
mod tests;
