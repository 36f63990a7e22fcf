// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token validation against the IdP's JWKS, plus the email
//! allow-list that decides who may log in at all.
//!
//! ## Auth Flow
//!
//! 1. The static site logs the user in with the IdP (Auth0)
//! 2. The browser sends `Authorization: Bearer <ID token>`
//! 3. The server:
//!    - Fetches the IdP JWKS via HTTPS (cached for an hour)
//!    - Verifies the `RS256` signature
//!    - Checks `exp`, `iss`, `sub` and `iat` in that order
//!    - Caches the result under a digest of the token
//!
//! ## Security
//!
//! - Protected endpoints require a valid token
//! - Only `RS256` keys from the configured tenant are trusted
//! - Clock skew tolerance is 30 seconds for `nbf`/`iat`; expiry is strict

pub mod access;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod validator;

pub use access::{AllowList, DenyMode, LoginDecision};
pub use claims::IdentityClaims;
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::JwksManager;
pub use validator::{TokenValidator, ValidatedToken};
