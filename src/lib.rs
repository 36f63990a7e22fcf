// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wall Server - Token-gated content and spreadsheet proxy
//!
//! Backend for a small static site that logs users in with Auth0. The
//! server validates the IdP's bearer tokens, gates logins with an email
//! allow-list and serves spreadsheet rows as table-shaped JSON.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token validation and the login allow-list
//! - `cache` - TTL caches shared by handlers
//! - `content` - Markdown documents served from the content directory
//! - `rate_limit` - Fixed-window limiter per caller IP
//! - `sheets` - SheetBest client, row normalization and fallback data
//! - `session` - Browser session model (routing, logout, content cache)
//! - `tooling` - Env file and client config generation for `wallctl`

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod rate_limit;
pub mod session;
pub mod sheets;
pub mod state;
pub mod tooling;

#[cfg(test)]
mod test_support;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::LOG_FORMAT_ENV;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Install the global subscriber. `RUST_LOG` sets the filter and
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
