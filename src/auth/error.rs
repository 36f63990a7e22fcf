// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant maps onto one of the flat, stable string codes returned to
//! clients as `{ "error": <code>, "message": <text> }`. Claim violations
//! additionally carry a `details` array.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authorization header absent or not of the form `Bearer <token>`
    HeaderInvalid,
    /// `Bearer ` prefix present but no token after it
    TokenMissing,
    /// Token header or payload could not be decoded
    TokenMalformed,
    /// Signature, key or algorithm rejected
    TokenInvalid(String),
    /// `exp` is in the past
    TokenExpired,
    /// `nbf` or `iat` lies in the future beyond the allowed clock skew
    TokenNotActive,
    /// `iss` does not match the configured IdP
    IssuerInvalid {
        expected: String,
        actual: Option<String>,
    },
    /// `sub` missing or empty
    SubjectMissing,
    /// Other required claims missing or mistyped
    InvalidClaims(Vec<String>),
    /// Identity is valid but not allowed in
    Unauthorized,
    /// A required setting is absent
    NotConfigured(&'static str),
    /// JWKS fetch failed
    JwksFetchError(String),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::HeaderInvalid => "header_invalid",
            AuthError::TokenMissing => "token_missing",
            AuthError::TokenMalformed => "token_malformed",
            AuthError::TokenInvalid(_) => "token_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotActive => "token_not_active",
            AuthError::IssuerInvalid { .. }
            | AuthError::SubjectMissing
            | AuthError::InvalidClaims(_) => "token_invalid_claims",
            AuthError::Unauthorized => "unauthorized",
            AuthError::NotConfigured(_)
            | AuthError::JwksFetchError(_)
            | AuthError::InternalError(_) => "server_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::HeaderInvalid
            | AuthError::TokenMissing
            | AuthError::TokenMalformed
            | AuthError::TokenInvalid(_)
            | AuthError::TokenExpired
            | AuthError::TokenNotActive
            | AuthError::IssuerInvalid { .. }
            | AuthError::SubjectMissing
            | AuthError::InvalidClaims(_) => StatusCode::UNAUTHORIZED,
            AuthError::Unauthorized => StatusCode::FORBIDDEN,
            AuthError::NotConfigured(_)
            | AuthError::JwksFetchError(_)
            | AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Per-claim explanations for `token_invalid_claims`.
    pub fn details(&self) -> Vec<String> {
        match self {
            AuthError::IssuerInvalid { expected, actual } => vec![match actual {
                Some(actual) => format!("iss must be {expected}, got {actual}"),
                None => format!("iss must be {expected}, got nothing"),
            }],
            AuthError::SubjectMissing => vec!["sub is required".to_string()],
            AuthError::InvalidClaims(details) => details.clone(),
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::HeaderInvalid => {
                write!(f, "Authorization header must be 'Bearer <token>'")
            }
            AuthError::TokenMissing => write!(f, "A bearer token is required"),
            AuthError::TokenMalformed => write!(f, "Token is malformed"),
            AuthError::TokenInvalid(reason) => write!(f, "Token is invalid: {reason}"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenNotActive => write!(f, "Token is not yet valid"),
            AuthError::IssuerInvalid { .. } => write!(f, "Token issuer is invalid"),
            AuthError::SubjectMissing => write!(f, "Token has no subject"),
            AuthError::InvalidClaims(_) => write!(f, "Token claims are invalid"),
            AuthError::Unauthorized => write!(f, "This account is not allowed to access the site"),
            AuthError::NotConfigured(name) => write!(f, "{name} is not configured"),
            AuthError::JwksFetchError(msg) => write!(f, "Failed to fetch JWKS: {msg}"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.error_code(),
            message: self.to_string(),
            details: self.details(),
        });
        (status, body).into_response()
    }
}
