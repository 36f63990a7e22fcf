// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AllowList, JwksManager, TokenValidator};
use crate::cache::InMemoryTtlCache;
use crate::config::Config;
use crate::content::ContentStore;
use crate::rate_limit::RateLimiter;
use crate::sheets::SheetService;

const TOKEN_CACHE_CAPACITY: usize = 1_000;
const SHEET_CACHE_CAPACITY: usize = 16;
const RATE_LIMIT_CAPACITY: usize = 10_000;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when `AUTH0_DOMAIN` is not set; protected routes then fail
    /// with `server_error`.
    pub validator: Option<Arc<TokenValidator>>,
    pub access: Arc<AllowList>,
    pub content: Arc<ContentStore>,
    pub sheets: Arc<SheetService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let validator = match (config.issuer(), config.resolved_jwks_url()) {
            (Some(issuer), Some(jwks_url)) => match JwksManager::new(jwks_url.clone()) {
                Ok(jwks) => {
                    tracing::info!(%issuer, %jwks_url, "Token validation enabled");
                    Some(Arc::new(TokenValidator::new(
                        Arc::new(jwks),
                        issuer,
                        Arc::new(InMemoryTtlCache::new(TOKEN_CACHE_CAPACITY)),
                        config.token_cache_ttl,
                    )))
                }
                Err(e) => {
                    tracing::error!(error = %e, "JWKS client unavailable; protected routes will answer server_error");
                    None
                }
            },
            _ => {
                tracing::warn!("AUTH0_DOMAIN not set; protected routes will answer server_error");
                None
            }
        };

        let access = Arc::new(AllowList::from_config(&config.access));
        let content = Arc::new(ContentStore::new(config.content_dir.clone()));
        let sheets = Arc::new(SheetService::new(
            &config.sheets,
            Arc::new(InMemoryTtlCache::new(SHEET_CACHE_CAPACITY)),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit,
            Arc::new(InMemoryTtlCache::new(RATE_LIMIT_CAPACITY)),
        ));

        Self {
            config: Arc::new(config),
            validator,
            access,
            content,
            sheets,
            rate_limiter,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
