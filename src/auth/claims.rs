// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity token claims.
//!
//! The signature check hands back an untyped JSON map. [`IdentityClaims::from_raw`]
//! turns that into a typed struct, enforcing the claim checks in a fixed
//! order so the first violation decides the error:
//!
//! 1. `exp` in the past → `token_expired`
//! 2. `iss` not the configured IdP → `token_invalid_claims`
//! 3. `sub` missing → `token_invalid_claims`
//! 4. `nbf`/`iat` in the future beyond the leeway → `token_not_active`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::AuthError;

/// Claim set as decoded from the token, before any typing.
pub type RawClaims = Map<String, Value>;

/// Claims of a verified IdP identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityClaims {
    /// Subject (IdP user id)
    pub sub: String,
    /// Issuer URL
    pub iss: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl IdentityClaims {
    /// Validate and type a raw claim set.
    ///
    /// `now` is a Unix timestamp; `leeway` (seconds) only relaxes the
    /// not-before and issued-at checks. Expiry is strict.
    pub fn from_raw(
        raw: &RawClaims,
        expected_issuer: &str,
        now: i64,
        leeway: u64,
    ) -> Result<Self, AuthError> {
        let exp = match raw.get("exp") {
            None | Some(Value::Null) => {
                return Err(AuthError::InvalidClaims(vec!["exp is required".to_string()]))
            }
            Some(value) => timestamp(value).ok_or_else(|| {
                AuthError::InvalidClaims(vec!["exp must be a numeric date".to_string()])
            })?,
        };
        if exp <= now {
            return Err(AuthError::TokenExpired);
        }

        let iss = string_claim(raw, "iss");
        if iss.as_deref() != Some(expected_issuer) {
            return Err(AuthError::IssuerInvalid {
                expected: expected_issuer.to_string(),
                actual: iss,
            });
        }

        let sub = string_claim(raw, "sub")
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::SubjectMissing)?;

        let leeway = leeway as i64;
        if let Some(nbf) = raw.get("nbf").and_then(timestamp) {
            if nbf > now + leeway {
                return Err(AuthError::TokenNotActive);
            }
        }
        let iat = raw.get("iat").and_then(timestamp);
        if let Some(iat) = iat {
            if iat > now + leeway {
                return Err(AuthError::TokenNotActive);
            }
        }

        let permissions = raw
            .get("permissions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            sub,
            iss: expected_issuer.to_string(),
            exp,
            iat,
            email: string_claim(raw, "email"),
            email_verified: raw.get("email_verified").and_then(Value::as_bool),
            name: string_claim(raw, "name"),
            picture: string_claim(raw, "picture"),
            permissions,
            scope: string_claim(raw, "scope"),
        })
    }
}

fn string_claim(raw: &RawClaims, name: &str) -> Option<String> {
    raw.get(name).and_then(Value::as_str).map(str::to_string)
}

/// NumericDate: integer seconds, fractional seconds are truncated.
fn timestamp(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}
