// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Logout cleanup.
//!
//! Clears local and session storage except the theme preference and
//! expires every cookie whose name mentions `auth` or `token`.

use super::storage::BrowserStorage;

/// Local storage key that survives logout.
pub const THEME_KEY: &str = "theme";

const EPOCH_EXPIRY: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// What the page has to do after local cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutPlan {
    /// `Set-Cookie`/`document.cookie` strings expiring auth cookies.
    pub expired_cookies: Vec<String>,
    pub redirect_to: String,
}

pub fn is_auth_cookie(name: &str) -> bool {
    let name = name.trim().to_ascii_lowercase();
    name.contains("auth") || name.contains("token")
}

/// Names of auth cookies in a `name=value; name2=value2` cookie string.
pub fn auth_cookie_names(cookie_header: &str) -> Vec<String> {
    cookie_header
        .split(';')
        .map(|pair| pair.split_once('=').map_or(pair, |(name, _)| name).trim())
        .filter(|name| !name.is_empty() && is_auth_cookie(name))
        .map(str::to_string)
        .collect()
}

pub fn expire_cookie(name: &str) -> String {
    format!("{name}=; expires={EPOCH_EXPIRY}; path=/")
}

pub fn perform_logout<L, S>(
    local: &mut L,
    session: &mut S,
    cookie_header: &str,
    redirect_to: &str,
) -> LogoutPlan
where
    L: BrowserStorage,
    S: BrowserStorage,
{
    let theme = local.get(THEME_KEY);
    local.clear();
    session.clear();
    if let Some(theme) = theme {
        local.set(THEME_KEY, theme);
    }

    let expired_cookies: Vec<String> = auth_cookie_names(cookie_header)
        .iter()
        .map(|name| expire_cookie(name))
        .collect();
    tracing::debug!(cookies = expired_cookies.len(), "Session cleared for logout");

    LogoutPlan {
        expired_cookies,
        redirect_to: redirect_to.to_string(),
    }
}
