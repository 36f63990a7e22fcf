// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Spreadsheet snapshots with explicit fallback.
//!
//! Live snapshots are cached per tab. When the client is not configured or
//! the upstream call fails, the built-in example rows are served instead and
//! the snapshot says so through `dataSource` and `fallbackReason`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::client::SheetBestClient;
use super::rows::{compute_stats, example_rows, SheetRow, SheetStats};
use crate::cache::TtlCache;
use crate::config::SheetConfig;

/// Where the rows of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DataSource {
    #[serde(rename = "SheetBest API")]
    SheetBest,
    #[serde(rename = "Example Data")]
    Example,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetSnapshot {
    pub success: bool,
    pub data_source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub items: Vec<SheetRow>,
    pub total: usize,
    pub stats: SheetStats,
    pub tab: String,
    pub timestamp: DateTime<Utc>,
}

impl SheetSnapshot {
    fn new(rows: Vec<SheetRow>, source: DataSource, reason: Option<String>, tab: &str) -> Self {
        Self {
            success: true,
            data_source: source,
            fallback_reason: reason,
            total: rows.len(),
            stats: compute_stats(&rows),
            items: rows,
            tab: if tab.is_empty() {
                "default".to_string()
            } else {
                tab.to_string()
            },
            timestamp: Utc::now(),
        }
    }
}

/// Result of a load, with how it was obtained.
#[derive(Debug, Clone)]
pub struct SheetLoad {
    pub snapshot: SheetSnapshot,
    /// The upstream call was attempted and failed.
    pub upstream_failed: bool,
    pub from_cache: bool,
}

pub struct SheetService {
    client: Result<SheetBestClient, String>,
    tab: String,
    cache: Arc<dyn TtlCache<SheetSnapshot>>,
    cache_ttl: Duration,
}

impl SheetService {
    pub fn new(config: &SheetConfig, cache: Arc<dyn TtlCache<SheetSnapshot>>) -> Self {
        let client = SheetBestClient::from_config(config).map_err(|e| {
            tracing::warn!(error = %e, "Spreadsheet source unavailable; example data will be served");
            e.to_string()
        });
        Self {
            client,
            tab: config.tab_name.clone(),
            cache,
            cache_ttl: config.cache_ttl,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_ok()
    }

    pub async fn load(&self) -> SheetLoad {
        let client = match &self.client {
            Ok(client) => client,
            Err(reason) => {
                return SheetLoad {
                    snapshot: self.fallback(reason.clone()),
                    upstream_failed: false,
                    from_cache: false,
                }
            }
        };

        let cache_key = format!("sheet:{}", self.tab);
        if let Some(snapshot) = self.cache.get(&cache_key) {
            return SheetLoad {
                snapshot,
                upstream_failed: false,
                from_cache: true,
            };
        }

        match client.fetch_rows(&self.tab).await {
            Ok(rows) => {
                let snapshot = SheetSnapshot::new(rows, DataSource::SheetBest, None, &self.tab);
                self.cache.set(&cache_key, snapshot.clone(), self.cache_ttl);
                SheetLoad {
                    snapshot,
                    upstream_failed: false,
                    from_cache: false,
                }
            }
            Err(err) => {
                tracing::error!(error = %err, tab = %self.tab, "Spreadsheet fetch failed; serving example data");
                SheetLoad {
                    snapshot: self.fallback(err.to_string()),
                    upstream_failed: true,
                    from_cache: false,
                }
            }
        }
    }

    fn fallback(&self, reason: String) -> SheetSnapshot {
        SheetSnapshot::new(example_rows(), DataSource::Example, Some(reason), &self.tab)
    }
}
