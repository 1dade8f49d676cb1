//! Metadata attached to every stored document.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Content type tag recorded on every rendered document.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Per-document metadata, stored alongside the manifest.
///
/// `owner_id` is the only access-scoping key and never changes after upload.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Constant content tag (`application/pdf` for rendered documents).
    pub content_type: String,

    /// Opaque client edit log, passed through unchanged. May be empty.
    pub delta: String,

    /// Identifier of the owning user, as supplied by the identity provider.
    pub owner_id: String,
}

impl DocumentMetadata {
    pub fn pdf(owner_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self {
            content_type: PDF_CONTENT_TYPE.to_string(),
            delta: delta.into(),
            owner_id: owner_id.into(),
        }
    }
}
