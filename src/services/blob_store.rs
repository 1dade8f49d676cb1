//! src/services/blob_store.rs
//!
//! BlobStore — chunked document storage backed by SQLite. A document is one
//! manifest row in `documents` plus its payload split into fixed-size rows in
//! `document_chunks`. Writes and deletes run inside a single transaction so a
//! manifest is visible only once every chunk is durable, and disappears
//! together with all of its chunks.

use crate::models::{
    document::{Document, with_pdf_extension},
    metadata::DocumentMetadata,
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::TryStreamExt;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Blob-splitting unit: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

const MANIFEST_COLUMNS: &str =
    "id, filename, length, chunk_size, upload_date, md5, content_type, delta, owner_id";

#[derive(Debug, Error)]
pub enum StoreError {
    /// No manifest matched. Also returned when the document exists under a
    /// different owner.
    #[error("document `{0}` not found")]
    NotFound(Uuid),
    #[error("failed to write document: {0}")]
    Write(#[source] sqlx::Error),
    #[error("storage backend unavailable: {0}")]
    Connection(#[source] sqlx::Error),
    #[error(transparent)]
    Query(sqlx::Error),
    #[error("document `{id}` is corrupt: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

impl StoreError {
    fn write(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            StoreError::Connection(err)
        } else {
            StoreError::Write(err)
        }
    }

    fn query(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            StoreError::Connection(err)
        } else {
            StoreError::Query(err)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// BlobStore provides the document storage operations:
/// - Upload (split bytes into chunks, write manifest + chunks atomically)
/// - Download (resolve manifest, concatenate chunks in order, verify)
/// - List by owner (metadata-filtered query)
/// - Resolve owned (id and owner in one predicate)
/// - Delete (manifest and chunks in one transaction, idempotent)
#[derive(Clone)]
pub struct BlobStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    chunk_size: usize,
}

impl BlobStore {
    /// Create a store over `db` using the default 1 MiB chunk size.
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self {
            db,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size. Zero is treated as one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Store `data` as a new document and return its manifest.
    ///
    /// The manifest and all chunks are written in one transaction. If any
    /// statement fails the transaction is dropped and rolled back, so neither
    /// a manifest nor stray chunks remain.
    pub async fn upload(
        &self,
        name: &str,
        data: &[u8],
        metadata: DocumentMetadata,
    ) -> StoreResult<Document> {
        let id = Uuid::new_v4();
        let filename = with_pdf_extension(name);
        let md5 = format!("{:x}", md5::compute(data));

        let mut tx = self.db.begin().await.map_err(StoreError::write)?;

        let document = sqlx::query_as::<_, Document>(&format!(
            "INSERT INTO documents ({MANIFEST_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {MANIFEST_COLUMNS}"
        ))
        .bind(id)
        .bind(&filename)
        .bind(data.len() as i64)
        .bind(self.chunk_size as i64)
        .bind(Utc::now())
        .bind(&md5)
        .bind(&metadata.content_type)
        .bind(&metadata.delta)
        .bind(&metadata.owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::write)?;

        let mut chunks = 0usize;
        for (n, chunk) in data.chunks(self.chunk_size).enumerate() {
            sqlx::query("INSERT INTO document_chunks (document_id, n, data) VALUES (?, ?, ?)")
                .bind(id)
                .bind(n as i64)
                .bind(chunk)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::write)?;
            chunks += 1;
        }

        tx.commit().await.map_err(StoreError::write)?;

        info!(
            object_id = %id,
            owner_id = %metadata.owner_id,
            length = data.len(),
            chunks,
            "stored document {}",
            filename
        );
        Ok(document)
    }

    /// Fetch a manifest by id, regardless of owner.
    pub async fn manifest(&self, id: Uuid) -> StoreResult<Document> {
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {MANIFEST_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await
        .map_err(StoreError::query)?
        .ok_or(StoreError::NotFound(id))
    }

    /// Fetch a manifest only if it belongs to `owner_id`.
    ///
    /// Id and owner are matched in one predicate; a document owned by someone
    /// else is indistinguishable from a missing one.
    pub async fn resolve_owned(&self, owner_id: &str, id: Uuid) -> StoreResult<Document> {
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {MANIFEST_COLUMNS} FROM documents WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&*self.db)
        .await
        .map_err(StoreError::query)?
        .ok_or(StoreError::NotFound(id))
    }

    /// Every manifest owned by `owner_id`, in the order the store committed
    /// them. SQLite admits one writer at a time, so rowid order is commit
    /// order even when `upload_date` values interleave.
    pub async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Document>> {
        let docs = sqlx::query_as::<_, Document>(&format!(
            "SELECT {MANIFEST_COLUMNS} FROM documents
             WHERE owner_id = ?
             ORDER BY rowid ASC"
        ))
        .bind(owner_id)
        .fetch_all(&*self.db)
        .await
        .map_err(StoreError::query)?;

        debug!(owner_id, count = docs.len(), "listed documents");
        Ok(docs)
    }

    /// Download the full payload of a document, regardless of owner.
    pub async fn download(&self, id: Uuid) -> StoreResult<Bytes> {
        self.open(id, None).await.map(|(_, bytes)| bytes)
    }

    /// Download a document owned by `owner_id`, returning its manifest too.
    pub async fn download_owned(&self, owner_id: &str, id: Uuid) -> StoreResult<(Document, Bytes)> {
        self.open(id, Some(owner_id)).await
    }

    /// Resolve the manifest and read its chunks inside one read transaction,
    /// so a concurrent delete cannot leave us with a manifest but no chunks.
    async fn open(&self, id: Uuid, owner_id: Option<&str>) -> StoreResult<(Document, Bytes)> {
        let mut tx = self.db.begin().await.map_err(StoreError::query)?;

        let mut query = format!("SELECT {MANIFEST_COLUMNS} FROM documents WHERE id = ?");
        if owner_id.is_some() {
            query.push_str(" AND owner_id = ?");
        }
        let mut manifest_query = sqlx::query_as::<_, Document>(&query).bind(id);
        if let Some(owner) = owner_id {
            manifest_query = manifest_query.bind(owner);
        }
        let document = manifest_query
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::query)?
            .ok_or(StoreError::NotFound(id))?;

        let payload = read_chunks(&mut tx, &document).await?;
        tx.commit().await.map_err(StoreError::query)?;

        Ok((document, payload))
    }

    /// Delete a document and all of its chunks. Deleting a missing id is a
    /// no-op; the return value tells whether anything was removed.
    pub async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.db.begin().await.map_err(StoreError::write)?;
        let (removed, chunks) = remove_rows(&mut tx, id, None).await?;
        tx.commit().await.map_err(StoreError::write)?;

        if removed {
            info!(object_id = %id, chunks, "deleted document");
        } else {
            debug!(object_id = %id, "delete of missing document ignored");
        }
        Ok(removed)
    }

    /// Delete a document only if it belongs to `owner_id`. A foreign or
    /// missing document is left untouched and reported as not removed.
    pub async fn delete_owned(&self, owner_id: &str, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.db.begin().await.map_err(StoreError::write)?;
        let (removed, chunks) = remove_rows(&mut tx, id, Some(owner_id)).await?;

        if !removed {
            tx.rollback().await.map_err(StoreError::write)?;
            debug!(object_id = %id, owner_id, "owned delete matched nothing");
            return Ok(false);
        }
        tx.commit().await.map_err(StoreError::write)?;

        info!(object_id = %id, owner_id, chunks, "deleted document");
        Ok(true)
    }

    /// Remove chunk rows whose manifest no longer exists.
    pub async fn purge_orphan_chunks(&self) -> StoreResult<u64> {
        let purged = sqlx::query(
            "DELETE FROM document_chunks
             WHERE document_id NOT IN (SELECT id FROM documents)",
        )
        .execute(&*self.db)
        .await
        .map_err(StoreError::write)?
        .rows_affected();

        if purged > 0 {
            warn!(purged, "purged orphan chunks");
        }
        Ok(purged)
    }

    /// Lightweight connectivity probe.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
            .map(|_| ())
            .map_err(StoreError::query)
    }
}

/// Delete the chunks and then the manifest of `id`, optionally only when
/// `owner_id` matches. Chunks go first so the count is not hidden by the
/// cascade on the manifest row. Returns whether a manifest was removed and
/// how many chunks went with it.
async fn remove_rows(
    conn: &mut SqliteConnection,
    id: Uuid,
    owner_id: Option<&str>,
) -> StoreResult<(bool, u64)> {
    let chunks = match owner_id {
        Some(owner) => sqlx::query(
            "DELETE FROM document_chunks WHERE document_id IN
             (SELECT id FROM documents WHERE id = ? AND owner_id = ?)",
        )
        .bind(id)
        .bind(owner),
        None => sqlx::query("DELETE FROM document_chunks WHERE document_id = ?").bind(id),
    }
    .execute(&mut *conn)
    .await
    .map_err(StoreError::write)?
    .rows_affected();

    let manifests = match owner_id {
        Some(owner) => sqlx::query("DELETE FROM documents WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner),
        None => sqlx::query("DELETE FROM documents WHERE id = ?").bind(id),
    }
    .execute(&mut *conn)
    .await
    .map_err(StoreError::write)?
    .rows_affected();

    Ok((manifests > 0, chunks))
}

/// Concatenate the chunks of `document` in order and verify them against the
/// manifest (chunk sequence, total length, checksum).
async fn read_chunks(conn: &mut SqliteConnection, document: &Document) -> StoreResult<Bytes> {
    let corrupt = |reason: String| {
        warn!(object_id = %document.id, "{}", reason);
        StoreError::Corrupt {
            id: document.id,
            reason,
        }
    };

    let mut buf = BytesMut::with_capacity(document.length.max(0) as usize);
    let mut expected = 0i64;
    {
        let mut rows = sqlx::query_as::<_, (i64, Vec<u8>)>(
            "SELECT n, data FROM document_chunks WHERE document_id = ? ORDER BY n ASC",
        )
        .bind(document.id)
        .fetch(&mut *conn);

        while let Some((n, data)) = rows.try_next().await.map_err(StoreError::query)? {
            if n != expected {
                return Err(corrupt(format!("expected chunk {} but found {}", expected, n)));
            }
            buf.extend_from_slice(&data);
            expected += 1;
        }
    }

    if expected != document.chunk_count() {
        return Err(corrupt(format!(
            "expected {} chunks but found {}",
            document.chunk_count(),
            expected
        )));
    }
    if buf.len() as i64 != document.length {
        return Err(corrupt(format!(
            "expected {} bytes but found {}",
            document.length,
            buf.len()
        )));
    }
    let digest = format!("{:x}", md5::compute(&buf));
    if digest != document.md5 {
        return Err(corrupt(format!(
            "checksum mismatch: manifest {} payload {}",
            document.md5, digest
        )));
    }

    debug!(object_id = %document.id, chunks = expected, "read document payload");
    Ok(buf.freeze())
}

/// Return true if the SQLx error means the backend itself is unreachable.
fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    async fn store() -> BlobStore {
        BlobStore::new(Arc::new(memory_pool().await))
    }

    async fn chunk_rows(store: &BlobStore, id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM document_chunks WHERE document_id = ?")
            .bind(id)
            .fetch_one(&*store.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upload_then_download_returns_same_bytes() {
        let store = store().await;
        let doc = store
            .upload("notes", b"Some string for testing", DocumentMetadata::pdf("1", "d"))
            .await
            .unwrap();

        assert_eq!(doc.filename, "notes.pdf");
        assert_eq!(doc.length, 23);
        assert_eq!(doc.chunk_size, DEFAULT_CHUNK_SIZE as i64);
        assert_eq!(doc.metadata.owner_id, "1");

        let bytes = store.download(doc.id).await.unwrap();
        assert_eq!(&bytes[..], b"Some string for testing");
    }

    #[tokio::test]
    async fn multi_chunk_payload_round_trips() {
        let store = store().await;
        let data: Vec<u8> = (0..(DEFAULT_CHUNK_SIZE * 2 + DEFAULT_CHUNK_SIZE / 2))
            .map(|i| (i % 251) as u8)
            .collect();

        let doc = store
            .upload("big", &data, DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();
        assert_eq!(doc.chunk_count(), 3);
        assert_eq!(chunk_rows(&store, doc.id).await, 3);

        let bytes = store.download(doc.id).await.unwrap();
        assert_eq!(bytes.len(), data.len());
        assert!(bytes[..] == data[..]);
    }

    #[tokio::test]
    async fn empty_payload_round_trips() {
        let store = store().await;
        let doc = store
            .upload("empty", b"", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();

        assert_eq!(doc.length, 0);
        assert_eq!(chunk_rows(&store, doc.id).await, 0);
        assert!(store.download(doc.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn small_chunk_size_splits_with_short_tail() {
        let store = store().await.with_chunk_size(4);
        let doc = store
            .upload("tail", b"0123456789", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();

        let lengths: Vec<i64> = sqlx::query_scalar(
            "SELECT length(data) FROM document_chunks WHERE document_id = ? ORDER BY n",
        )
        .bind(doc.id)
        .fetch_all(&*store.db)
        .await
        .unwrap();
        assert_eq!(lengths, vec![4, 4, 2]);
        assert_eq!(&store.download(doc.id).await.unwrap()[..], b"0123456789");
    }

    #[tokio::test]
    async fn download_of_unknown_id_is_not_found() {
        let store = store().await;
        let err = store.download(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_by_owner_is_scoped_and_ordered() {
        let store = store().await;
        let first = store
            .upload("a", b"1", DocumentMetadata::pdf("1", "some delta 1"))
            .await
            .unwrap();
        let other = store
            .upload("b", b"2", DocumentMetadata::pdf("2", "some delta 2"))
            .await
            .unwrap();
        let second = store
            .upload("a", b"3", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();

        let ids: Vec<Uuid> = store
            .list_by_owner("1")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let others = store.list_by_owner("2").await.unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, other.id);
        assert_eq!(others[0].metadata.delta, "some delta 2");

        assert!(store.list_by_owner("3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_owned_hides_foreign_documents() {
        let store = store().await;
        let doc = store
            .upload("mine", b"x", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();

        assert_eq!(store.resolve_owned("1", doc.id).await.unwrap(), doc);
        assert!(store.resolve_owned("2", doc.id).await.unwrap_err().is_not_found());
        assert!(store.manifest(doc.id).await.is_ok());
        assert!(store.download_owned("2", doc.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_removes_manifest_and_chunks_and_is_idempotent() {
        let store = store().await.with_chunk_size(2);
        let doc = store
            .upload("gone", b"abcdef", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();
        assert_eq!(chunk_rows(&store, doc.id).await, 3);

        assert!(store.delete(doc.id).await.unwrap());
        assert!(store.download(doc.id).await.unwrap_err().is_not_found());
        assert_eq!(chunk_rows(&store, doc.id).await, 0);

        assert!(!store.delete(doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_owned_leaves_foreign_documents_alone() {
        let store = store().await;
        let doc = store
            .upload("keep", b"payload", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();

        assert!(!store.delete_owned("2", doc.id).await.unwrap());
        assert_eq!(&store.download(doc.id).await.unwrap()[..], b"payload");

        assert!(store.delete_owned("1", doc.id).await.unwrap());
        assert!(!store.delete_owned("1", doc.id).await.unwrap());
        assert_eq!(chunk_rows(&store, doc.id).await, 0);
    }

    #[tokio::test]
    async fn tampered_chunk_is_reported_corrupt() {
        let store = store().await;
        let doc = store
            .upload("t", b"pristine", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();
        sqlx::query("UPDATE document_chunks SET data = ? WHERE document_id = ?")
            .bind(&b"tampered"[..])
            .bind(doc.id)
            .execute(&*store.db)
            .await
            .unwrap();

        let err = store.download(doc.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn orphan_chunks_are_purged() {
        let store = store().await;
        let kept = store
            .upload("k", b"keep", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();
        // Simulate a write that left chunks behind without a manifest.
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&*store.db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO document_chunks (document_id, n, data) VALUES (?, 0, ?)")
            .bind(Uuid::new_v4())
            .bind(&b"stale"[..])
            .execute(&*store.db)
            .await
            .unwrap();

        assert_eq!(store.purge_orphan_chunks().await.unwrap(), 1);
        assert_eq!(chunk_rows(&store, kept.id).await, 1);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_chunks")
            .fetch_one(&*store.db)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    async fn count(store: &BlobStore, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&*store.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_chunk_write_rolls_back_the_whole_document() {
        let store = store().await.with_chunk_size(4);
        sqlx::query(
            "CREATE TRIGGER fail_third_chunk BEFORE INSERT ON document_chunks
             WHEN NEW.n = 2
             BEGIN SELECT RAISE(ABORT, 'disk full'); END",
        )
        .execute(&*store.db)
        .await
        .unwrap();

        let err = store
            .upload("doomed", b"0123456789ab", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write(_)), "{err:?}");

        assert_eq!(count(&store, "documents").await, 0);
        assert_eq!(count(&store, "document_chunks").await, 0);
        assert!(store.list_by_owner("1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removal_counts_chunks_before_the_cascade() {
        let store = store().await.with_chunk_size(2);
        let doc = store
            .upload("gone", b"abcdef", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();

        let mut tx = store.db.begin().await.unwrap();
        assert_eq!(remove_rows(&mut tx, doc.id, Some("2")).await.unwrap(), (false, 0));
        assert_eq!(remove_rows(&mut tx, doc.id, Some("1")).await.unwrap(), (true, 3));
        assert_eq!(remove_rows(&mut tx, doc.id, None).await.unwrap(), (false, 0));
        tx.commit().await.unwrap();

        assert_eq!(count(&store, "document_chunks").await, 0);
    }

    #[tokio::test]
    async fn listing_follows_commit_order_not_upload_date() {
        let store = store().await;
        let first = store
            .upload("a", b"1", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();
        let second = store
            .upload("b", b"2", DocumentMetadata::pdf("1", ""))
            .await
            .unwrap();
        // A clock step backwards between writers.
        sqlx::query("UPDATE documents SET upload_date = '2099-01-01T00:00:00Z' WHERE id = ?")
            .bind(first.id)
            .execute(&*store.db)
            .await
            .unwrap();

        let ids: Vec<Uuid> = store
            .list_by_owner("1")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_uploads_stay_owner_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("store.db").display());
        let pool = crate::db::connect(&url, 8).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        let store = BlobStore::new(Arc::new(pool)).with_chunk_size(1024);

        let owners = ["1", "2", "3", "4"];
        let mut tasks = Vec::new();
        for round in 0..5u8 {
            for owner in owners {
                let store = store.clone();
                tasks.push(tokio::spawn(async move {
                    let payload: Vec<u8> = (0..3000u32)
                        .map(|i| (i as u8).wrapping_add(round) ^ owner.as_bytes()[0])
                        .collect();
                    let doc = store
                        .upload("c", &payload, DocumentMetadata::pdf(owner, ""))
                        .await
                        .unwrap();
                    let listed = store.list_by_owner(owner).await.unwrap();
                    assert!(listed.iter().all(|d| d.metadata.owner_id == owner));
                    (owner, doc.id, payload)
                }));
            }
        }

        let mut uploads = Vec::new();
        for task in tasks {
            uploads.push(task.await.unwrap());
        }

        for owner in owners {
            let listed = store.list_by_owner(owner).await.unwrap();
            assert_eq!(listed.len(), 5);
            assert!(listed.iter().all(|d| d.metadata.owner_id == owner));
        }
        for (owner, id, payload) in uploads {
            let (doc, bytes) = store.download_owned(owner, id).await.unwrap();
            assert_eq!(doc.chunk_count(), 3);
            assert!(bytes[..] == payload[..]);
        }
    }
}
