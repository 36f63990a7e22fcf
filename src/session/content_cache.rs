// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Browser-side cache of the protected content payload.
//!
//! Stored as the payload's own fields plus `timestamp` (epoch milliseconds)
//! and considered fresh for five minutes.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::storage::BrowserStorage;

pub const CONTENT_CACHE_KEY: &str = "protected_content_cache";

/// Five minutes, in milliseconds.
pub const CONTENT_FRESH_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEnvelope<T> {
    #[serde(flatten)]
    pub payload: T,
    pub timestamp: i64,
}

impl<T> ContentEnvelope<T> {
    pub fn new(payload: T, now_ms: i64) -> Self {
        Self {
            payload,
            timestamp: now_ms,
        }
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp <= CONTENT_FRESH_MS
    }
}

pub fn store_content<T, S>(storage: &mut S, payload: &T, now_ms: i64) -> Result<(), serde_json::Error>
where
    T: Serialize,
    S: BrowserStorage,
{
    let encoded = serde_json::to_string(&ContentEnvelope::new(payload, now_ms))?;
    storage.set(CONTENT_CACHE_KEY, encoded);
    Ok(())
}

/// Read the cached payload. Stale or unreadable entries are removed.
pub fn load_content<T, S>(storage: &mut S, now_ms: i64) -> Option<T>
where
    T: DeserializeOwned,
    S: BrowserStorage,
{
    let raw = storage.get(CONTENT_CACHE_KEY)?;
    match serde_json::from_str::<ContentEnvelope<T>>(&raw) {
        Ok(envelope) if envelope.is_fresh(now_ms) => Some(envelope.payload),
        Ok(_) => {
            storage.remove(CONTENT_CACHE_KEY);
            None
        }
        Err(err) => {
            tracing::debug!(error = %err, "Dropping unreadable content cache");
            storage.remove(CONTENT_CACHE_KEY);
            None
        }
    }
}
