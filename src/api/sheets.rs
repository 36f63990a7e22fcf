// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::content::X_CACHE;
use crate::auth::Auth;
use crate::sheets::SheetSnapshot;
use crate::state::AppState;

/// Spreadsheet rows with summary statistics.
///
/// Falls back to the example dataset when the source is not configured
/// (200) or the upstream call fails (500, rows still included).
#[utoipa::path(
    get,
    path = "/v1/sheet",
    tag = "Sheets",
    responses(
        (status = 200, description = "Live rows or example rows when unconfigured", body = SheetSnapshot),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Upstream failed; example rows served", body = SheetSnapshot)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_sheet(State(state): State<AppState>, Auth(token): Auth) -> Response {
    let load = state.sheets.load().await;
    tracing::debug!(
        sub = %token.claims.sub,
        source = ?load.snapshot.data_source,
        rows = load.snapshot.total,
        "Sheet served"
    );

    let status = if load.upstream_failed {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    let cache = if load.from_cache { "HIT" } else { "MISS" };
    (status, [(X_CACHE, cache)], Json(load.snapshot)).into_response()
}
