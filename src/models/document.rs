//! Represents a stored document manifest and its listing projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::metadata::DocumentMetadata;

/// Extension appended to every stored filename.
pub const PDF_EXTENSION: &str = ".pdf";

/// The manifest of a stored document.
///
/// Describes the payload (name, size, chunking, checksum) without holding any
/// of its bytes. Manifests are immutable once written.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Store-assigned identifier; the only handle used for lookups.
    #[serde(rename = "objectId")]
    pub id: Uuid,

    /// Display name, always carrying the document extension. Not unique.
    pub filename: String,

    /// Total payload size in bytes.
    pub length: i64,

    /// Size of every chunk except possibly the last.
    pub chunk_size: i64,

    /// When the upload committed.
    pub upload_date: DateTime<Utc>,

    /// Hex MD5 of the full payload.
    pub md5: String,

    #[sqlx(flatten)]
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Number of chunk rows the payload occupies.
    pub fn chunk_count(&self) -> i64 {
        if self.length == 0 || self.chunk_size <= 0 {
            0
        } else {
            (self.length + self.chunk_size - 1) / self.chunk_size
        }
    }
}

/// A row of an owner's document listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub object_id: Uuid,
    pub filename: String,
    pub length: i64,
    pub upload_date: DateTime<Utc>,
    pub delta: String,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            object_id: doc.id,
            filename: doc.filename,
            length: doc.length,
            upload_date: doc.upload_date,
            delta: doc.metadata.delta,
        }
    }
}

/// Append the document extension unless the name already ends with it.
pub fn with_pdf_extension(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.to_ascii_lowercase().ends_with(PDF_EXTENSION) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, PDF_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(length: i64) -> Document {
        Document {
            id: Uuid::new_v4(),
            filename: "a.pdf".into(),
            length,
            chunk_size: 4,
            upload_date: Utc::now(),
            md5: String::new(),
            metadata: DocumentMetadata::pdf("1", ""),
        }
    }

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(manifest(0).chunk_count(), 0);
        assert_eq!(manifest(4).chunk_count(), 1);
        assert_eq!(manifest(5).chunk_count(), 2);
        assert_eq!(manifest(8).chunk_count(), 2);
    }

    #[test]
    fn extension_is_appended_once() {
        assert_eq!(with_pdf_extension("report"), "report.pdf");
        assert_eq!(with_pdf_extension("report.PDF"), "report.PDF");
        assert_eq!(with_pdf_extension(" notes "), "notes.pdf");
    }

    #[test]
    fn manifest_serializes_object_id_and_nested_metadata() {
        let doc = manifest(3);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["objectId"], doc.id.to_string());
        assert_eq!(json["chunkSize"], 4);
        assert_eq!(json["metadata"]["ownerId"], "1");
        assert_eq!(json["metadata"]["contentType"], "application/pdf");
    }
}
