//! Core data models for the document store.
//!
//! A stored document is described by its manifest (`Document`), which maps to
//! the `documents` table via `sqlx::FromRow` and serializes as camelCase JSON
//! via `serde`. Payload bytes live in `document_chunks` and never appear here.

pub mod document;
pub mod metadata;
