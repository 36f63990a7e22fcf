// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local environment file written by `wallctl setup` and read back by
//! `wallctl inject-env development`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::ToolingError;

pub const DEFAULT_ENV_FILE: &str = ".env.local";
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:8888";

/// Answers collected by the setup prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupAnswers {
    pub project_name: String,
    pub auth0_domain: String,
    pub auth0_client_id: String,
    pub base_url: String,
}

impl SetupAnswers {
    pub fn validate(&self) -> Result<(), ToolingError> {
        let mut missing = Vec::new();
        if self.auth0_domain.trim().is_empty() {
            missing.push("AUTH0_DOMAIN");
        }
        if self.auth0_client_id.trim().is_empty() {
            missing.push("AUTH0_CLIENT_ID");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolingError::MissingVariables(missing))
        }
    }

    /// URLs to register in the IdP dashboard.
    pub fn callback_urls(&self) -> Vec<String> {
        let base = self.base_url.trim_end_matches('/');
        [base, DEFAULT_LOCAL_URL]
            .iter()
            .filter(|b| !b.is_empty())
            .flat_map(|b| {
                ["/", "/app/", "/forbidden.html"]
                    .iter()
                    .map(move |path| format!("{b}{path}"))
            })
            .collect()
    }
}

pub fn render_env_file(answers: &SetupAnswers, generated_at: DateTime<Utc>) -> String {
    format!(
        "# Project: {project}\n\
         \n\
         # Identity provider\n\
         AUTH0_DOMAIN={domain}\n\
         AUTH0_CLIENT_ID={client_id}\n\
         \n\
         # Site URLs\n\
         NETLIFY_URL={base_url}\n\
         LOCAL_URL={local_url}\n\
         \n\
         # Spreadsheet source (optional)\n\
         SHEETBEST_API_KEY=\n\
         SHEETBEST_SHEET_ID=\n\
         \n\
         # Generated {generated}\n",
        project = answers.project_name.trim(),
        domain = answers.auth0_domain.trim(),
        client_id = answers.auth0_client_id.trim(),
        base_url = answers.base_url.trim(),
        local_url = DEFAULT_LOCAL_URL,
        generated = generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    )
}

/// Read `KEY=value` pairs from an env file. A missing file yields no
/// variables.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, ToolingError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Env file not found");
        return Ok(BTreeMap::new());
    }

    dotenv::from_path_iter(path)?
        .map(|item| item.map_err(ToolingError::from))
        .collect()
}
