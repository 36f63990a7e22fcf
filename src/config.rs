// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`Config`] struct built from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH0_DOMAIN` | IdP tenant domain (issuer is `https://<domain>/`) | Required for protected routes |
//! | `AUTH0_JWKS_URL` | JWKS endpoint override | `https://<domain>/.well-known/jwks.json` |
//! | `ALLOWED_ORIGINS` | Comma-separated CORS origins | `http://localhost:8888` |
//! | `ALLOWED_EMAILS` | Comma-separated exact email allow-list | empty |
//! | `ALLOWED_DOMAIN` | Email domain suffix allowed to log in | empty |
//! | `ACCESS_DENY_MODE` | `redirect` or `reject` | `redirect` |
//! | `FORBIDDEN_URL` | Redirect target for denied logins | `/forbidden.html` |
//! | `SHEETBEST_API_KEY` | SheetBest API key | Example data when absent |
//! | `SHEETBEST_SHEET_ID` | SheetBest sheet id | Example data when absent |
//! | `SHEETBEST_TAB_NAME` | Sheet tab (empty for the default tab) | `All` |
//! | `SHEETBEST_BASE_URL` | SheetBest API root | `https://api.sheetbest.com` |
//! | `RATE_LIMIT_MAX_REQUESTS` | Requests allowed per window and IP | `100` |
//! | `RATE_LIMIT_WINDOW_SECS` | Fixed window length | `900` |
//! | `TOKEN_CACHE_TTL_SECS` | Validated token cache lifetime | `300` |
//! | `SHEET_CACHE_TTL_SECS` | Spreadsheet snapshot cache lifetime | `300` |
//! | `CONTENT_DIR` | Directory of protected markdown documents | `app/content` |
//! | `TRUST_PROXY_HEADERS` | Take the client IP from `client-ip`/`x-forwarded-for`/`x-real-ip` | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::access::DenyMode;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const AUTH0_JWKS_URL_ENV: &str = "AUTH0_JWKS_URL";
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";
pub const ALLOWED_EMAILS_ENV: &str = "ALLOWED_EMAILS";
pub const ALLOWED_DOMAIN_ENV: &str = "ALLOWED_DOMAIN";
pub const ACCESS_DENY_MODE_ENV: &str = "ACCESS_DENY_MODE";
pub const FORBIDDEN_URL_ENV: &str = "FORBIDDEN_URL";
pub const SHEETBEST_API_KEY_ENV: &str = "SHEETBEST_API_KEY";
pub const SHEETBEST_SHEET_ID_ENV: &str = "SHEETBEST_SHEET_ID";
pub const SHEETBEST_TAB_NAME_ENV: &str = "SHEETBEST_TAB_NAME";
pub const SHEETBEST_BASE_URL_ENV: &str = "SHEETBEST_BASE_URL";
pub const RATE_LIMIT_MAX_REQUESTS_ENV: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const RATE_LIMIT_WINDOW_SECS_ENV: &str = "RATE_LIMIT_WINDOW_SECS";
pub const TOKEN_CACHE_TTL_SECS_ENV: &str = "TOKEN_CACHE_TTL_SECS";
pub const SHEET_CACHE_TTL_SECS_ENV: &str = "SHEET_CACHE_TTL_SECS";
pub const CONTENT_DIR_ENV: &str = "CONTENT_DIR";
pub const TRUST_PROXY_HEADERS_ENV: &str = "TRUST_PROXY_HEADERS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8888";
pub const DEFAULT_FORBIDDEN_URL: &str = "/forbidden.html";
pub const DEFAULT_SHEETBEST_BASE_URL: &str = "https://api.sheetbest.com";
pub const DEFAULT_SHEETBEST_TAB: &str = "All";
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;
/// 15 minutes.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 900;
pub const DEFAULT_TOKEN_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_SHEET_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CONTENT_DIR: &str = "app/content";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// SheetBest connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    pub api_key: Option<String>,
    pub sheet_id: Option<String>,
    /// Empty means the sheet's default tab.
    pub tab_name: String,
    pub base_url: String,
    pub cache_ttl: Duration,
}

/// Email allow-list settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    pub allowed_emails: Vec<String>,
    pub allowed_domain: Option<String>,
    pub deny_mode: DenyMode,
    pub forbidden_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Only set behind a proxy that overwrites the forwarding headers.
    /// Otherwise callers could pick a fresh address per request.
    pub trust_proxy_headers: bool,
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// IdP tenant domain. `None` leaves protected routes failing with
    /// `server_error`.
    pub auth0_domain: Option<String>,
    pub jwks_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub token_cache_ttl: Duration,
    pub content_dir: PathBuf,
    pub access: AccessConfig,
    pub sheets: SheetConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let auth0_domain = get(AUTH0_DOMAIN_ENV).map(|d| normalize_domain(&d));

        let mut allowed_origins = split_list(get(ALLOWED_ORIGINS_ENV));
        if allowed_origins.is_empty() {
            allowed_origins.push(DEFAULT_ALLOWED_ORIGIN.to_string());
        }

        let deny_mode = match get(ACCESS_DENY_MODE_ENV) {
            None => DenyMode::Redirect,
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: ACCESS_DENY_MODE_ENV,
                value: raw.clone(),
                reason,
            })?,
        };

        // The tab may legitimately be empty, so it is read without the
        // blank filter.
        let tab_name = lookup(SHEETBEST_TAB_NAME_ENV)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SHEETBEST_TAB.to_string());

        Ok(Config {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(PORT_ENV, get(PORT_ENV), DEFAULT_PORT)?,
            auth0_domain,
            jwks_url: get(AUTH0_JWKS_URL_ENV),
            allowed_origins,
            token_cache_ttl: Duration::from_secs(parse_or(
                TOKEN_CACHE_TTL_SECS_ENV,
                get(TOKEN_CACHE_TTL_SECS_ENV),
                DEFAULT_TOKEN_CACHE_TTL_SECS,
            )?),
            content_dir: PathBuf::from(
                get(CONTENT_DIR_ENV).unwrap_or_else(|| DEFAULT_CONTENT_DIR.to_string()),
            ),
            access: AccessConfig {
                allowed_emails: split_list(get(ALLOWED_EMAILS_ENV)),
                allowed_domain: get(ALLOWED_DOMAIN_ENV),
                deny_mode,
                forbidden_url: get(FORBIDDEN_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_FORBIDDEN_URL.to_string()),
            },
            sheets: SheetConfig {
                api_key: get(SHEETBEST_API_KEY_ENV),
                sheet_id: get(SHEETBEST_SHEET_ID_ENV),
                tab_name,
                base_url: get(SHEETBEST_BASE_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_SHEETBEST_BASE_URL.to_string()),
                cache_ttl: Duration::from_secs(parse_or(
                    SHEET_CACHE_TTL_SECS_ENV,
                    get(SHEET_CACHE_TTL_SECS_ENV),
                    DEFAULT_SHEET_CACHE_TTL_SECS,
                )?),
            },
            rate_limit: RateLimitConfig {
                max_requests: parse_or(
                    RATE_LIMIT_MAX_REQUESTS_ENV,
                    get(RATE_LIMIT_MAX_REQUESTS_ENV),
                    DEFAULT_RATE_LIMIT_MAX_REQUESTS,
                )?,
                window: Duration::from_secs(parse_or(
                    RATE_LIMIT_WINDOW_SECS_ENV,
                    get(RATE_LIMIT_WINDOW_SECS_ENV),
                    DEFAULT_RATE_LIMIT_WINDOW_SECS,
                )?),
                trust_proxy_headers: parse_or(
                    TRUST_PROXY_HEADERS_ENV,
                    get(TRUST_PROXY_HEADERS_ENV),
                    false,
                )?,
            },
        })
    }

    /// Expected `iss` claim: `https://<domain>/`.
    pub fn issuer(&self) -> Option<String> {
        self.auth0_domain.as_ref().map(|d| format!("https://{d}/"))
    }

    /// JWKS endpoint, from the override or derived from the domain.
    pub fn resolved_jwks_url(&self) -> Option<String> {
        self.jwks_url.clone().or_else(|| {
            self.auth0_domain
                .as_ref()
                .map(|d| format!("https://{d}/.well-known/jwks.json"))
        })
    }
}

impl Default for Config {
    /// Defaults with nothing external configured.
    fn default() -> Self {
        Self::from_lookup(|_| None).unwrap_or_else(|_| unreachable!("defaults always parse"))
    }
}

/// Strip scheme and trailing slashes so `https://x.auth0.com/` becomes `x.auth0.com`.
fn normalize_domain(raw: &str) -> String {
    raw.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
