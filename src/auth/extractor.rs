// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated requests.
//!
//! Use the `Auth` extractor in handlers to require a valid bearer token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(token): Auth) -> impl IntoResponse {
//!     // token.claims is IdentityClaims
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::validator::{parse_bearer, ValidatedToken};
use super::AuthError;
use crate::config::AUTH0_DOMAIN_ENV;
use crate::state::AppState;

/// Extractor for authenticated requests.
///
/// The header is checked before anything else, so a request without a
/// usable bearer token is answered with `header_invalid` or
/// `token_missing` even when the IdP is not configured.
pub struct Auth(pub ValidatedToken);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthError::HeaderInvalid))
            .transpose()?;
        let token = parse_bearer(header)?;

        let validator = state.validator.as_deref().ok_or_else(|| {
            tracing::error!("{AUTH0_DOMAIN_ENV} is not set; rejecting authenticated request");
            AuthError::NotConfigured(AUTH0_DOMAIN_ENV)
        })?;

        match validator.validate(token).await {
            Ok(validated) => Ok(Auth(validated)),
            Err(err) => {
                tracing::info!(code = err.error_code(), "Token rejected");
                Err(err)
            }
        }
    }
}
