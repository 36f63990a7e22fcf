// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, IdentityClaims};
use crate::content::{render_html, ContentDocument, ContentEntry};
use crate::error::ApiError;
use crate::state::AppState;

pub const X_CACHE: &str = "x-cache";

const NO_STORE: &str = "no-cache, no-store, must-revalidate";

/// Caller identity echoed back with the content.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContentUser {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<&IdentityClaims> for ContentUser {
    fn from(claims: &IdentityClaims) -> Self {
        Self {
            sub: claims.sub.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
            picture: claims.picture.clone(),
            permissions: claims.permissions.clone(),
            scope: claims.scope.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContentIndexEntry {
    /// Path to request under `/v1/content/`.
    pub path: String,
    pub filename: String,
    pub size: u64,
}

impl From<ContentEntry> for ContentIndexEntry {
    fn from(entry: ContentEntry) -> Self {
        Self {
            path: entry.path,
            filename: entry.filename,
            size: entry.size,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub success: bool,
    pub user: ContentUser,
    pub documents: Vec<ContentIndexEntry>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub filename: String,
    /// Dotted extension, empty for files without one.
    pub extension: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub markdown: String,
    pub html: String,
    pub metadata: DocumentMetadata,
    pub user: ContentUser,
}

/// Representation picked from the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    /// `text/markdown` or `text/plain`
    Markdown,
    /// `application/json`
    Json,
    Html,
}

impl ContentFormat {
    /// Raw markdown wins over JSON; anything else gets HTML.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if accept.contains("text/markdown") || accept.contains("text/plain") {
            Self::Markdown
        } else if accept.contains("application/json") {
            Self::Json
        } else {
            Self::Html
        }
    }
}

/// Index of the protected documents for the signed-in user.
///
/// The body built on the first request is cached with the token, so
/// repeated calls within the cache window return identical bytes with
/// `X-Cache: HIT`.
#[utoipa::path(
    get,
    path = "/v1/content",
    tag = "Content",
    responses(
        (status = 200, description = "Document index for the caller", body = ContentResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Identity provider not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_content(
    State(state): State<AppState>,
    Auth(token): Auth,
) -> Result<Response, ApiError> {
    if let Some(body) = token.cached_body.clone() {
        return Ok(json_bytes(body, "HIT"));
    }

    let documents = state
        .content
        .list()
        .await?
        .into_iter()
        .map(ContentIndexEntry::from)
        .collect();
    let content = ContentResponse {
        success: true,
        user: ContentUser::from(&token.claims),
        documents,
        generated_at: Utc::now(),
    };
    let body = Bytes::from(
        serde_json::to_vec(&content)
            .map_err(|e| ApiError::server_error(format!("Failed to encode content: {e}")))?,
    );
    if let Some(validator) = &state.validator {
        validator.remember_body(&token, body.clone());
    }
    tracing::debug!(sub = %token.claims.sub, "Content index built");
    Ok(json_bytes(body, "MISS"))
}

/// One protected markdown document.
///
/// `Accept: text/markdown` (or `text/plain`) returns the source,
/// `application/json` returns source, rendered HTML and metadata, and
/// anything else returns the rendered HTML.
#[utoipa::path(
    get,
    path = "/v1/content/{path}",
    tag = "Content",
    params(("path" = String, Path, description = "Document path; `.md` is tried first when no extension is given")),
    responses(
        (status = 200, description = "Document in the negotiated format", body = DocumentResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Path outside the content directory"),
        (status = 404, description = "Document not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_document(
    State(state): State<AppState>,
    Auth(token): Auth,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let document = state.content.read(&path).await?;
    let format = ContentFormat::from_headers(&headers);
    tracing::debug!(sub = %token.claims.sub, %path, ?format, "Document served");

    let response = match format {
        ContentFormat::Markdown => (
            [
                (header::CONTENT_TYPE, "text/markdown; charset=utf-8"),
                (header::CACHE_CONTROL, NO_STORE),
            ],
            document.markdown,
        )
            .into_response(),
        ContentFormat::Json => (
            [(header::CACHE_CONTROL, NO_STORE)],
            Json(DocumentResponse::new(document, &token.claims)),
        )
            .into_response(),
        ContentFormat::Html => (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, NO_STORE),
            ],
            render_html(&document.markdown),
        )
            .into_response(),
    };
    Ok(response)
}

impl DocumentResponse {
    fn new(document: ContentDocument, claims: &IdentityClaims) -> Self {
        Self {
            html: render_html(&document.markdown),
            metadata: DocumentMetadata {
                filename: document.filename,
                extension: document.extension,
                size: document.size,
                last_modified: document.last_modified,
            },
            markdown: document.markdown,
            user: ContentUser::from(claims),
        }
    }
}

fn json_bytes(body: Bytes, cache: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, no-cache")),
        ],
        [(X_CACHE, cache)],
        body,
    )
        .into_response()
}
