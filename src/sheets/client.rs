// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SheetBest REST client.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::info;
use url::Url;

use super::rows::{normalize_rows, SheetRow};
use crate::config::{SheetConfig, SHEETBEST_API_KEY_ENV, SHEETBEST_SHEET_ID_ENV};

const API_KEY_HEADER: &str = "X-Api-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    #[error("SheetBest base URL is invalid: {0}")]
    InvalidUrl(String),

    #[error("SheetBest request failed: {0}")]
    Request(String),

    #[error("SheetBest answered HTTP {0}")]
    Status(u16),

    #[error("SheetBest response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct SheetBestClient {
    base_url: Url,
    api_key: String,
    sheet_id: String,
    http: Client,
}

impl SheetBestClient {
    pub fn new(base_url: &str, api_key: String, sheet_id: String) -> Result<Self, SheetError> {
        let base_url = Url::parse(base_url).map_err(|e| SheetError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetError::InvalidUrl(base_url.to_string()));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SheetError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_key,
            sheet_id,
            http,
        })
    }

    pub fn from_config(config: &SheetConfig) -> Result<Self, SheetError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(SheetError::MissingConfig(SHEETBEST_API_KEY_ENV))?;
        let sheet_id = config
            .sheet_id
            .clone()
            .ok_or(SheetError::MissingConfig(SHEETBEST_SHEET_ID_ENV))?;
        Self::new(&config.base_url, api_key, sheet_id)
    }

    /// `<base>/sheets/<id>/tabs/<tab>`, or `<base>/sheets/<id>` for the
    /// default tab. Segments are percent-encoded.
    pub fn tab_url(&self, tab: &str) -> Result<Url, SheetError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SheetError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("sheets").push(&self.sheet_id);
            if !tab.is_empty() {
                segments.push("tabs").push(tab);
            }
        }
        Ok(url)
    }

    pub async fn fetch_rows(&self, tab: &str) -> Result<Vec<SheetRow>, SheetError> {
        let url = self.tab_url(tab)?;
        info!(sheet_id = %self.sheet_id, tab, "Loading spreadsheet rows");

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetError::Status(status.as_u16()));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| SheetError::InvalidResponse(e.to_string()))?;
        let rows = normalize_rows(&raw)?;
        info!(rows = rows.len(), "Spreadsheet rows loaded");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> SheetBestClient {
        SheetBestClient::new(base, "key-123".into(), "sheet-abc".into()).unwrap()
    }

    #[test]
    fn tab_url_encodes_the_tab() {
        let client = client("https://api.sheetbest.com");
        assert_eq!(
            client.tab_url("All").unwrap().as_str(),
            "https://api.sheetbest.com/sheets/sheet-abc/tabs/All"
        );
        assert_eq!(
            client.tab_url("Web Pages").unwrap().as_str(),
            "https://api.sheetbest.com/sheets/sheet-abc/tabs/Web%20Pages"
        );
        assert_eq!(
            client.tab_url("").unwrap().as_str(),
            "https://api.sheetbest.com/sheets/sheet-abc"
        );
    }

    #[test]
    fn from_config_requires_key_and_sheet() {
        let mut config = crate::config::Config::default().sheets;
        assert!(matches!(
            SheetBestClient::from_config(&config),
            Err(SheetError::MissingConfig("SHEETBEST_API_KEY"))
        ));
        config.api_key = Some("k".into());
        assert!(matches!(
            SheetBestClient::from_config(&config),
            Err(SheetError::MissingConfig("SHEETBEST_SHEET_ID"))
        ));
        config.sheet_id = Some("s".into());
        assert!(SheetBestClient::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn fetch_sends_api_key_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sheets/sheet-abc/tabs/All"))
            .and(header("X-Api-Key", "key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"ID": "A", "Name": "Alpha", "Type": "Section"},
                {"ID": "", "Name": ""}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client(&server.uri()).fetch_rows("All").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Alpha");
    }

    #[tokio::test]
    async fn upstream_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client(&server.uri()).fetch_rows("All").await.unwrap_err();
        assert!(matches!(err, SheetError::Status(403)));
    }
}
