// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Browser configuration script (`assets/js/env-config.js`).

use std::collections::BTreeMap;

use serde::Serialize;

use super::env_file::DEFAULT_LOCAL_URL;
use super::ToolingError;

pub const DEFAULT_OUTPUT: &str = "assets/js/env-config.js";

/// Variables read from the process environment for production builds.
pub const PRODUCTION_VARS: [&str; 4] = ["AUTH0_DOMAIN", "AUTH0_CLIENT_ID", "NETLIFY_URL", "URL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DeployTarget {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ClientConfig {
    pub auth0_domain: String,
    pub auth0_client_id: String,
    pub base_url: String,
}

impl ClientConfig {
    pub fn resolve(
        target: DeployTarget,
        vars: &BTreeMap<String, String>,
    ) -> Result<Self, ToolingError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let auth0_domain = get("AUTH0_DOMAIN");
        let auth0_client_id = get("AUTH0_CLIENT_ID");
        let missing: Vec<&'static str> = [
            ("AUTH0_DOMAIN", auth0_domain.is_none()),
            ("AUTH0_CLIENT_ID", auth0_client_id.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(ToolingError::MissingVariables(missing));
        }

        let base_url = match target {
            DeployTarget::Production => get("NETLIFY_URL").or_else(|| get("URL")).unwrap_or_default(),
            DeployTarget::Development => {
                get("LOCAL_URL").unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string())
            }
        };

        Ok(Self {
            auth0_domain: auth0_domain.unwrap_or_default(),
            auth0_client_id: auth0_client_id.unwrap_or_default(),
            base_url,
        })
    }

    /// The generated script: `window.ENV_CONFIG` plus the IdP client
    /// options derived from it.
    pub fn render_js(&self) -> Result<String, ToolingError> {
        let env_config = serde_json::to_string_pretty(self)?;
        Ok(format!(
            "// Generated by `wallctl inject-env`. Do not edit.\n\
             \n\
             window.ENV_CONFIG = {env_config};\n\
             \n\
             window.AUTH0_CONFIG = {{\n\
             \x20   domain: window.ENV_CONFIG.AUTH0_DOMAIN,\n\
             \x20   client_id: window.ENV_CONFIG.AUTH0_CLIENT_ID,\n\
             \x20   redirect_uri: window.ENV_CONFIG.BASE_URL || window.location.origin + '/',\n\
             \x20   cacheLocation: 'localstorage'\n\
             }};\n"
        ))
    }
}

/// Production variables from the process environment.
pub fn process_env_vars() -> BTreeMap<String, String> {
    PRODUCTION_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
        .collect()
}
