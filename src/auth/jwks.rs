// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - Only RSA keys usable for `RS256` are turned into decoding keys
//! - Keys are cached with a configurable TTL (one hour by default)
//! - An unknown `kid` forces one refetch so rotated keys are picked up

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::DecodingKey;
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default JWKS cache TTL (1 hour).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// JWKS HTTP timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching.
///
/// Fetches and caches the IdP's JWKS for token verification.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g., `https://tenant.auth0.com/.well-known/jwks.json`)
    ///
    /// Fails if the HTTP client (with its fetch timeout) cannot be built.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client: http_client(FETCH_TIMEOUT)?,
        })
    }

    #[cfg(test)]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Result<Self, AuthError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    /// Create with custom cache TTL.
    #[cfg(test)]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch JWKS (with caching). The flag tells whether it came from cache.
    async fn get_jwks(&self) -> Result<(JwkSet, bool), AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok((entry.jwks.clone(), true));
                }
            }
        }

        let jwks = self.refresh_inner().await?;
        Ok((jwks, false))
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))
    }

    async fn refresh_inner(&self) -> Result<JwkSet, AuthError> {
        let jwks = self.fetch_jwks().await.inspect_err(|e| {
            tracing::warn!(url = %self.jwks_url, error = %e, "JWKS fetch failed");
        })?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(jwks)
    }

    /// Get the `RS256` decoding key for the given key ID.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let (jwks, from_cache) = self.get_jwks().await?;
        if let Some(jwk) = find_key(&jwks, kid) {
            return jwk_to_decoding_key(jwk);
        }

        if from_cache {
            // Key may have been rotated since the last fetch.
            let jwks = self.refresh_inner().await?;
            if let Some(jwk) = find_key(&jwks, kid) {
                return jwk_to_decoding_key(jwk);
            }
        }

        Err(AuthError::TokenInvalid(format!("no signing key with kid {kid}")))
    }

    /// Get any usable decoding key (for tokens without kid).
    pub async fn get_any_decoding_key(&self) -> Result<DecodingKey, AuthError> {
        let (jwks, _) = self.get_jwks().await?;
        jwks.keys
            .iter()
            .find_map(|jwk| jwk_to_decoding_key(jwk).ok())
            .ok_or_else(|| AuthError::TokenInvalid("no usable signing key".to_string()))
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.refresh_inner().await.map(|_| ())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        if let Some(entry) = &*cache {
            entry.fetched_at.elapsed() < self.cache_ttl
        } else {
            false
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AuthError::InternalError(format!("failed to build HTTP client: {e}")))
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert an RSA JWK to an `RS256` decoding key.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    if let Some(alg) = jwk.common.key_algorithm {
        if alg != KeyAlgorithm::RS256 {
            return Err(AuthError::TokenInvalid(format!(
                "signing key algorithm {alg:?} is not accepted"
            )));
        }
    }
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::InternalError(format!("Failed to create RSA key: {e}"))),
        _ => Err(AuthError::TokenInvalid(
            "signing key is not an RSA key".to_string(),
        )),
    }
}
