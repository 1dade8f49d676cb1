//! HTTP handlers for document operations.
//! Every route is scoped to the caller identified by `Owner`; storage and
//! rendering concerns are delegated to `DocumentService`.

use crate::{
    errors::AppError,
    models::document::{Document, DocumentSummary},
    services::document_service::DocumentService,
};
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the authenticated user id, set by the upstream identity
/// provider.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. The id is opaque and never validated here.
#[derive(Debug, Clone)]
pub struct Owner(pub String);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Owner(v.to_string()))
            .ok_or_else(|| AppError::unauthorized("missing user identity"))
    }
}

/// Body of `POST /documents` and `PUT /documents/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub filename: String,
    pub html: String,
    #[serde(default)]
    pub delta: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    pub object_id: Uuid,
}

/// An id that does not parse cannot name a document.
fn parse_object_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found())
}

/// `POST /documents` — render and store a new document.
pub async fn create_document(
    State(service): State<DocumentService>,
    Owner(owner): Owner,
    Json(req): Json<DocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let object_id = service
        .render_and_store(&owner, &req.filename, &req.html, &req.delta)
        .await?;

    Ok((StatusCode::CREATED, Json(StoredResponse { object_id })))
}

/// `GET /documents` — list the caller's documents.
pub async fn list_documents(
    State(service): State<DocumentService>,
    Owner(owner): Owner,
) -> Result<Json<Vec<DocumentSummary>>, AppError> {
    Ok(Json(service.list_for_owner(&owner).await?))
}

/// `GET /documents/{id}` — the PDF itself, for inline display.
pub async fn view_document(
    State(service): State<DocumentService>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id)?;
    let (meta, bytes) = service.fetch_owned(&owner, id).await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    set_document_headers(response.headers_mut(), &meta);

    Ok(response)
}

/// `GET /documents/{id}/meta` — the manifest only.
pub async fn document_meta(
    State(service): State<DocumentService>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let id = parse_object_id(&id)?;
    Ok(Json(service.resolve_owned(&owner, id).await?))
}

/// `PUT /documents/{id}` — store a new rendering and drop the old one.
pub async fn replace_document(
    State(service): State<DocumentService>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(req): Json<DocumentRequest>,
) -> Result<Json<StoredResponse>, AppError> {
    let id = parse_object_id(&id)?;
    let object_id = service
        .replace(&owner, id, &req.filename, &req.html, &req.delta)
        .await?;
    Ok(Json(StoredResponse { object_id }))
}

/// `DELETE /documents/{id}` — idempotent; always 204 for a well-formed id.
pub async fn delete_document(
    State(service): State<DocumentService>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_object_id(&id)?;
    service.remove(&owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn set_document_headers(headers: &mut HeaderMap, meta: &Document) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.metadata.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/pdf")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&meta.length.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    if let Ok(value) = HeaderValue::from_str(&content_disposition(&meta.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", meta.md5)) {
        headers.insert(header::ETAG, value);
    }
    if let Some(digest) = md5_base64(&meta.md5) {
        if let Ok(value) = HeaderValue::from_str(&digest) {
            headers.insert(HeaderName::from_static("content-md5"), value);
        }
    }

    headers.insert(
        header::LAST_MODIFIED,
        HeaderValue::from_str(&meta.upload_date.to_rfc2822())
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
}

/// `inline` disposition with an ASCII fallback name and the exact UTF-8 name
/// in `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::new();
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    format!("inline; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}

/// Convert the stored hex digest into the base64 form `Content-MD5` uses.
fn md5_base64(hex: &str) -> Option<String> {
    if hex.len() != 32 {
        return None;
    }
    let mut raw = [0u8; 16];
    for (i, slot) in raw.iter_mut().enumerate() {
        *slot = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
    }
    Some(general_purpose::STANDARD.encode(raw))
}
