//! Render HTML to PDF and keep the results in a per-user chunked document
//! store.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;

use axum::Router;
use std::sync::Arc;

use crate::{
    render::Renderer,
    services::{blob_store::BlobStore, document_service::DocumentService},
};

/// Wire the store, renderer and routes into a ready-to-serve router.
pub fn build_app(db: Arc<sqlx::SqlitePool>, renderer: Renderer) -> Router {
    let max_html_bytes = renderer.max_html_bytes();
    let service = DocumentService::new(BlobStore::new(db), renderer);
    routes::routes::routes(max_html_bytes).with_state(service)
}
