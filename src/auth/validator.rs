// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token validation.
//!
//! [`TokenValidator`] is the single place where identity tokens are checked:
//! header parsing, JWKS lookup, `RS256` signature verification and the
//! ordered claim checks in [`IdentityClaims::from_raw`].
//!
//! Successful results are cached under a digest of the raw token, together
//! with the response body built for it, so repeated requests with the same
//! token skip verification and return identical bytes.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use sha2::{Digest, Sha256};

use super::claims::{IdentityClaims, RawClaims};
use super::{AuthError, JwksManager};
use crate::cache::TtlCache;

/// Clock skew tolerance for `nbf` and `iat` (30 seconds).
pub const CLOCK_SKEW_LEEWAY: u64 = 30;

/// Hex characters of the token digest used as cache key.
const CACHE_KEY_HEX_LEN: usize = 32;

/// Cached validation result.
#[derive(Debug, Clone)]
pub struct TokenCacheEntry {
    pub claims: IdentityClaims,
    /// Response body already served for this token.
    pub body: Option<Bytes>,
}

/// A token that passed validation, fresh or from cache.
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    pub claims: IdentityClaims,
    pub cache_key: String,
    /// Set on a cache hit when a body was remembered for this token.
    pub cached_body: Option<Bytes>,
}

impl ValidatedToken {
    pub fn is_cache_hit(&self) -> bool {
        self.cached_body.is_some()
    }
}

pub struct TokenValidator {
    jwks: Arc<JwksManager>,
    issuer: String,
    leeway: u64,
    cache: Arc<dyn TtlCache<TokenCacheEntry>>,
    cache_ttl: Duration,
}

impl TokenValidator {
    pub fn new(
        jwks: Arc<JwksManager>,
        issuer: impl Into<String>,
        cache: Arc<dyn TtlCache<TokenCacheEntry>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            jwks,
            issuer: issuer.into(),
            leeway: CLOCK_SKEW_LEEWAY,
            cache,
            cache_ttl,
        }
    }

    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Validate a raw token (without the `Bearer ` prefix).
    pub async fn validate(&self, token: &str) -> Result<ValidatedToken, AuthError> {
        let cache_key = cache_key(token);
        let now = chrono::Utc::now().timestamp();

        if let Some(entry) = self.cache.get(&cache_key) {
            if entry.claims.exp > now {
                tracing::debug!(sub = %entry.claims.sub, "Token cache hit");
                return Ok(ValidatedToken {
                    claims: entry.claims,
                    cache_key,
                    cached_body: entry.body,
                });
            }
            self.cache.remove(&cache_key);
        }

        let claims = self.verify(token, now).await?;
        self.cache.set(
            &cache_key,
            TokenCacheEntry {
                claims: claims.clone(),
                body: None,
            },
            self.entry_ttl(&claims, now),
        );

        Ok(ValidatedToken {
            claims,
            cache_key,
            cached_body: None,
        })
    }

    /// Store the response body built for a validated token.
    pub fn remember_body(&self, token: &ValidatedToken, body: Bytes) {
        let now = chrono::Utc::now().timestamp();
        self.cache.set(
            &token.cache_key,
            TokenCacheEntry {
                claims: token.claims.clone(),
                body: Some(body),
            },
            self.entry_ttl(&token.claims, now),
        );
    }

    /// Configured TTL, capped at the token's remaining lifetime.
    fn entry_ttl(&self, claims: &IdentityClaims, now: i64) -> Duration {
        let remaining = u64::try_from(claims.exp - now).unwrap_or(0);
        self.cache_ttl.min(Duration::from_secs(remaining))
    }

    async fn verify(&self, token: &str, now: i64) -> Result<IdentityClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::TokenMalformed)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::TokenInvalid(format!(
                "algorithm {:?} is not accepted",
                header.alg
            )));
        }

        let decoding_key = match header.kid.as_deref() {
            Some(kid) => self.jwks.get_decoding_key(kid).await?,
            None => self.jwks.get_any_decoding_key().await?,
        };

        // Time-based claims are checked in `IdentityClaims::from_raw` so the
        // failure order stays fixed.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.leeway;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<RawClaims>(token, &decoding_key, &validation).map_err(map_jwt_error)?;
        IdentityClaims::from_raw(&data.claims, &self.issuer, now, self.leeway)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::TokenInvalid("signature mismatch".to_string()),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AuthError::TokenInvalid("algorithm mismatch".to_string())
        }
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotActive,
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::InvalidClaims(vec![format!("{claim} is required")])
        }
        _ => AuthError::TokenMalformed,
    }
}

/// Parse an `Authorization` header value into the raw token.
///
/// Only the literal `Bearer <token>` form is accepted.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::HeaderInvalid)?;
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::TokenMissing);
    }
    Ok(token)
}

/// Cache key for a raw token: a prefix of its SHA-256 digest.
pub fn cache_key(token: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(token.as_bytes()));
    format!("token:{}", &digest[..CACHE_KEY_HEX_LEN])
}
