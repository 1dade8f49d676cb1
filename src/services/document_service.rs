//! DocumentService ties rendering to storage: render HTML, store the PDF
//! under its owner, and resolve, list or remove stored documents.

use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    models::{
        document::{Document, DocumentSummary, with_pdf_extension},
        metadata::DocumentMetadata,
    },
    render::{RenderError, Renderer},
    services::blob_store::{BlobStore, StoreError},
};

/// Name used when the caller supplies a blank filename.
const UNTITLED: &str = "untitled";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("could not generate document: {0}")]
    Render(#[from] RenderError),
    #[error("document `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DocumentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => DocumentError::NotFound(id),
            other => DocumentError::Store(other),
        }
    }
}

impl DocumentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentError::NotFound(_))
    }
}

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Clone)]
pub struct DocumentService {
    pub store: BlobStore,
    renderer: Renderer,
}

impl DocumentService {
    pub fn new(store: BlobStore, renderer: Renderer) -> Self {
        Self { store, renderer }
    }

    /// Render `html` and store the PDF for `owner_id`. Returns the new id.
    pub async fn render_and_store(
        &self,
        owner_id: &str,
        filename: &str,
        html: &str,
        delta: &str,
    ) -> DocumentResult<Uuid> {
        let name = display_name(filename);
        let pdf = self
            .renderer
            .render_blocking(html.to_string(), Some(with_pdf_extension(&name)))
            .await?;

        let document = self
            .store
            .upload(&name, &pdf, DocumentMetadata::pdf(owner_id, delta))
            .await?;
        Ok(document.id)
    }

    /// Full payload of a document, regardless of owner.
    pub async fn fetch(&self, object_id: Uuid) -> DocumentResult<Bytes> {
        Ok(self.store.download(object_id).await?)
    }

    /// Payload and manifest of a document owned by `owner_id`.
    pub async fn fetch_owned(&self, owner_id: &str, object_id: Uuid) -> DocumentResult<(Document, Bytes)> {
        Ok(self.store.download_owned(owner_id, object_id).await?)
    }

    pub async fn list_for_owner(&self, owner_id: &str) -> DocumentResult<Vec<DocumentSummary>> {
        let docs = self.store.list_by_owner(owner_id).await?;
        Ok(docs.into_iter().map(DocumentSummary::from).collect())
    }

    pub async fn resolve_owned(&self, owner_id: &str, object_id: Uuid) -> DocumentResult<Document> {
        Ok(self.store.resolve_owned(owner_id, object_id).await?)
    }

    /// Delete a document owned by `owner_id`. Missing or foreign documents
    /// are left alone and the call still succeeds.
    pub async fn remove(&self, owner_id: &str, object_id: Uuid) -> DocumentResult<()> {
        self.store.delete_owned(owner_id, object_id).await?;
        Ok(())
    }

    /// Store a new rendering and then delete the old document. The old one
    /// must belong to `owner_id`; this is checked before rendering.
    pub async fn replace(
        &self,
        owner_id: &str,
        old_id: Uuid,
        filename: &str,
        html: &str,
        delta: &str,
    ) -> DocumentResult<Uuid> {
        self.store.resolve_owned(owner_id, old_id).await?;
        let new_id = self.render_and_store(owner_id, filename, html, delta).await?;
        self.store.delete_owned(owner_id, old_id).await?;
        info!(%old_id, %new_id, owner_id, "replaced document");
        Ok(new_id)
    }

    pub async fn ping(&self) -> DocumentResult<()> {
        Ok(self.store.ping().await?)
    }
}

fn display_name(filename: &str) -> String {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}
