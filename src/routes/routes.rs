//! Defines routes for document operations.
//!
//! ## Structure
//! - **Collection endpoints**
//!   - `POST   /documents` — render and store a document
//!   - `GET    /documents` — list the caller's documents
//!
//! - **Document endpoints**
//!   - `GET    /documents/{id}`      — the PDF, for inline display
//!   - `GET    /documents/{id}/meta` — manifest only
//!   - `PUT    /documents/{id}`      — replace with a new rendering
//!   - `DELETE /documents/{id}`      — delete (idempotent)
//!
//! Every document route requires the `x-user-id` header.

use crate::{
    handlers::{
        document_handlers::{
            create_document, delete_document, document_meta, list_documents, replace_document,
            view_document,
        },
        health_handlers::{healthz, readyz},
    },
    services::document_service::DocumentService,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};

/// Room for JSON framing and escaping around the HTML payload.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Build and return the router for all document routes.
///
/// Request bodies may be up to twice `max_html_bytes` (JSON escaping can
/// double markup) plus framing; the renderer enforces the exact HTML limit.
pub fn routes(max_html_bytes: usize) -> Router<DocumentService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Collection routes
        .route("/documents", get(list_documents).post(create_document))
        // Document routes
        .route(
            "/documents/{id}",
            get(view_document)
                .put(replace_document)
                .delete(delete_document),
        )
        .route("/documents/{id}/meta", get(document_meta))
        .layer(DefaultBodyLimit::max(
            max_html_bytes.saturating_mul(2).saturating_add(BODY_OVERHEAD),
        ))
}
