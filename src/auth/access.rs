// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email allow-list.
//!
//! A login is allowed when the (trimmed, lowercased) email is in the exact
//! list or ends with the configured domain suffix. Denied logins are either
//! redirected to the forbidden page or rejected outright.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::AccessConfig;

/// What happens to a denied login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DenyMode {
    /// Send the user to the forbidden page
    Redirect,
    /// Refuse the login with an error
    Reject,
}

impl FromStr for DenyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(DenyMode::Redirect),
            "reject" => Ok(DenyMode::Reject),
            other => Err(format!("expected 'redirect' or 'reject', got '{other}'")),
        }
    }
}

/// Outcome of a login check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginDecision {
    Allow,
    /// `redirect_to` is `None` in reject mode.
    Deny { redirect_to: Option<String> },
}

/// Exact emails plus one optional domain suffix.
#[derive(Debug, Clone)]
pub struct AllowList {
    emails: HashSet<String>,
    /// Always starts with `@`.
    domain_suffix: Option<String>,
    deny_mode: DenyMode,
    forbidden_url: String,
}

impl AllowList {
    pub fn new<I, S>(emails: I, domain: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        let domain_suffix = domain
            .map(normalize)
            .map(|d| d.trim_start_matches('@').to_string())
            .filter(|d| !d.is_empty())
            .map(|d| format!("@{d}"));

        Self {
            emails,
            domain_suffix,
            deny_mode: DenyMode::Redirect,
            forbidden_url: crate::config::DEFAULT_FORBIDDEN_URL.to_string(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(&config.allowed_emails, config.allowed_domain.as_deref())
            .with_deny_mode(config.deny_mode, &config.forbidden_url)
    }

    pub fn with_deny_mode(mut self, mode: DenyMode, forbidden_url: impl Into<String>) -> Self {
        self.deny_mode = mode;
        self.forbidden_url = forbidden_url.into();
        self
    }

    pub fn deny_mode(&self) -> DenyMode {
        self.deny_mode
    }

    /// Whether `email` may log in.
    pub fn is_authorized(&self, email: &str) -> bool {
        let email = normalize(email);
        if email.is_empty() {
            return false;
        }
        if self.emails.contains(&email) {
            return true;
        }
        match &self.domain_suffix {
            Some(suffix) => email.len() > suffix.len() && email.ends_with(suffix.as_str()),
            None => false,
        }
    }

    pub fn evaluate(&self, email: &str) -> LoginDecision {
        if self.is_authorized(email) {
            return LoginDecision::Allow;
        }
        tracing::info!(deny_mode = ?self.deny_mode, "Login denied by allow-list");
        match self.deny_mode {
            DenyMode::Redirect => LoginDecision::Deny {
                redirect_to: Some(self.forbidden_url.clone()),
            },
            DenyMode::Reject => LoginDecision::Deny { redirect_to: None },
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}
