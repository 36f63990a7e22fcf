// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthError, LoginDecision};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessDecisionRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecisionResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

/// Decide whether an email may log in.
///
/// Called by the IdP post-login hook. Denied logins get the forbidden page
/// to redirect to, or a 403 when the service runs in reject mode.
#[utoipa::path(
    post,
    path = "/v1/access/decision",
    tag = "Access",
    request_body = AccessDecisionRequest,
    responses(
        (status = 200, description = "Decision for the email", body = AccessDecisionResponse),
        (status = 400, description = "Email missing"),
        (status = 403, description = "Login rejected")
    )
)]
pub async fn access_decision(
    State(state): State<AppState>,
    Json(request): Json<AccessDecisionRequest>,
) -> Result<Json<AccessDecisionResponse>, ApiError> {
    if request.email.trim().is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }

    match state.access.evaluate(&request.email) {
        LoginDecision::Allow => Ok(Json(AccessDecisionResponse {
            allowed: true,
            redirect_to: None,
        })),
        LoginDecision::Deny {
            redirect_to: Some(url),
        } => Ok(Json(AccessDecisionResponse {
            allowed: false,
            redirect_to: Some(url),
        })),
        LoginDecision::Deny { redirect_to: None } => Err(AuthError::Unauthorized.into()),
    }
}
