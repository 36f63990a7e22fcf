// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::content::ContentError;

/// Error returned by handlers outside the auth extractor.
///
/// Serialized with the same `{error, message}` shape as auth errors so
/// clients handle a single error format.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "server_error", message)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Forbidden => Self::forbidden(err.to_string()),
            ContentError::NotFound => Self::not_found(err.to_string()),
            ContentError::Io(e) => {
                tracing::error!(error = %e, "Failed to read content");
                Self::server_error("Failed to read content")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.code.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_code() {
        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.code, "bad_request");
        assert_eq!(bad.message, "bad");

        let denied = ApiError::forbidden("no");
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.code, "forbidden");

        let missing = ApiError::not_found("gone");
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.code, "not_found");

        let internal = ApiError::server_error("oops");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.code, "server_error");
    }

    #[test]
    fn auth_errors_keep_status_and_code() {
        let err = ApiError::from(AuthError::Unauthorized);
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.code, "unauthorized");
        assert_eq!(err.message, "This account is not allowed to access the site");
    }

    #[test]
    fn content_errors_map_to_status() {
        let forbidden = ApiError::from(ContentError::Forbidden);
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
        assert_eq!(forbidden.code, "forbidden");

        let missing = ApiError::from(ContentError::NotFound);
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.code, "not_found");

        let io = ApiError::from(ContentError::Io(std::io::Error::other("disk")));
        assert_eq!(io.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.message, "Failed to read content");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad_request","message":"bad data"}"#);
    }
}
