// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Page-load routing for the static site.
//!
//! [`SessionMachine`] decides where the browser goes on the index and login
//! pages. It is a plain state machine fed with events; the page glue does
//! the actual IdP calls and navigation.
//!
//! ```text
//!                  code callback ok / cached session
//!  Unauthenticated ─────────────────────────────────▶ Authenticated
//!        │   ▲                                             │
//!        │   └──────────────────── logout ─────────────────┘
//!        │ callback failure, network failure, timeout
//!        ▼
//!      Error  (terminal until the next page load)
//! ```

use std::time::Duration;

use url::form_urlencoded;

pub const INDEX_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login.html";
pub const APP_PATH: &str = "/app/";
pub const FORBIDDEN_PATH: &str = "/forbidden.html";

/// How long the index page may stay pending before it shows an error.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Index,
    Login,
    Other,
}

impl Page {
    pub fn from_path(path: &str) -> Self {
        match path {
            "/" | "/index.html" => Page::Index,
            LOGIN_PATH => Page::Login,
            _ => Page::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    Callback(String),
    Network(String),
    Timeout,
}

impl std::fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFailure::Callback(msg) => write!(f, "Login callback failed: {msg}"),
            SessionFailure::Network(msg) => write!(f, "Could not reach the identity provider: {msg}"),
            SessionFailure::Timeout => write!(f, "Timed out while checking the session"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Error(SessionFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A page finished loading. `authenticated` is the IdP client's cached
    /// session flag.
    PageLoad {
        path: String,
        query: String,
        authenticated: bool,
    },
    CallbackSucceeded,
    CallbackFailed { error: String },
    NetworkFailed(String),
    TimedOut,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Navigate without leaving a history entry.
    Replace(String),
    /// Regular navigation.
    Assign(String),
    /// Exchange the `code` in the URL with the IdP, then report back.
    ExchangeCode,
    ShowLogin,
    ShowError(String),
    Stay,
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    page: Page,
    /// Waiting for the IdP (code exchange); the timeout only applies here
    /// and before the first page load settles.
    pending: bool,
    logout_url: String,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            page: Page::Other,
            pending: true,
            logout_url: INDEX_PATH.to_string(),
        }
    }

    pub fn with_logout_url(mut self, url: impl Into<String>) -> Self {
        self.logout_url = url.into();
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn handle(&mut self, event: SessionEvent) -> Navigation {
        if let SessionEvent::PageLoad {
            path,
            query,
            authenticated,
        } = event
        {
            return self.page_load(&path, &query, authenticated);
        }

        if matches!(self.state, SessionState::Error(_)) {
            return Navigation::Stay;
        }

        match event {
            SessionEvent::PageLoad { .. } => Navigation::Stay,
            SessionEvent::CallbackSucceeded => {
                self.pending = false;
                self.state = SessionState::Authenticated;
                match self.page {
                    Page::Login => Navigation::Replace(APP_PATH.to_string()),
                    _ => Navigation::Assign(APP_PATH.to_string()),
                }
            }
            SessionEvent::CallbackFailed { error } => {
                self.pending = false;
                if error.contains("access_denied") {
                    return Navigation::Replace(FORBIDDEN_PATH.to_string());
                }
                self.fail(SessionFailure::Callback(error))
            }
            SessionEvent::NetworkFailed(msg) => {
                self.pending = false;
                self.fail(SessionFailure::Network(msg))
            }
            SessionEvent::TimedOut => {
                if self.pending && self.page == Page::Index {
                    self.pending = false;
                    self.fail(SessionFailure::Timeout)
                } else {
                    Navigation::Stay
                }
            }
            SessionEvent::Logout => {
                self.pending = false;
                self.state = SessionState::Unauthenticated;
                Navigation::Replace(self.logout_url.clone())
            }
        }
    }

    fn page_load(&mut self, path: &str, query: &str, authenticated: bool) -> Navigation {
        self.page = Page::from_path(path);
        self.state = SessionState::Unauthenticated;
        self.pending = true;

        let params: Vec<(String, String)> =
            form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect();
        let param = |name: &str| params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());

        if param("error") == Some("access_denied") {
            self.pending = false;
            return Navigation::Replace(FORBIDDEN_PATH.to_string());
        }

        if self.page == Page::Other {
            self.pending = false;
            return Navigation::Stay;
        }

        if param("code").is_some() {
            return Navigation::ExchangeCode;
        }

        self.pending = false;
        if authenticated {
            self.state = SessionState::Authenticated;
            return match self.page {
                Page::Login => Navigation::Replace(APP_PATH.to_string()),
                _ => Navigation::Assign(APP_PATH.to_string()),
            };
        }

        match self.page {
            Page::Index => Navigation::Assign(LOGIN_PATH.to_string()),
            _ => Navigation::ShowLogin,
        }
    }

    fn fail(&mut self, failure: SessionFailure) -> Navigation {
        tracing::warn!(%failure, "Session entered error state");
        let message = failure.to_string();
        self.state = SessionState::Error(failure);
        Navigation::ShowError(message)
    }
}
