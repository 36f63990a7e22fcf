// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared test fixtures: one RS256 signing key, its JWKS document and
//! helpers to mint tokens and mock the IdP.

use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_KID: &str = "test-key-1";
pub const TEST_DOMAIN: &str = "tenant.example.auth0.com";
pub const TEST_ISSUER: &str = "https://tenant.example.auth0.com/";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub struct TestKeys {
    pub encoding: EncodingKey,
    pub jwks: Value,
}

/// Key generation is slow, so every test shares one key pair.
pub fn test_keys() -> &'static TestKeys {
    static KEYS: OnceLock<TestKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let private =
            RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 2048).expect("generate RSA key");
        let pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .expect("encode private key");
        let encoding = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("load private key");

        let n = URL_SAFE_NO_PAD.encode(private.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(private.e().to_bytes_be());
        let jwks = json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": TEST_KID,
                "n": n,
                "e": e
            }]
        });

        TestKeys { encoding, jwks }
    })
}

/// Claims of a valid token for [`TEST_ISSUER`], expiring in an hour.
pub fn test_claims() -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "sub": "auth0|user-1",
        "iss": TEST_ISSUER,
        "aud": "wall-client",
        "exp": now + 3600,
        "iat": now,
        "email": "partner@gmail.com",
        "email_verified": true,
        "name": "Partner",
        "picture": "https://cdn.example.com/partner.png"
    })
}

/// Sign `claims` with the test key, `kid` set.
pub fn sign(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, claims, &test_keys().encoding).expect("sign token")
}

/// Swap in the signature of a different token.
pub fn tamper_signature(token: &str) -> String {
    let other = sign(&json!({"sub": "someone-else", "exp": 1}));
    let (head, _) = token.rsplit_once('.').expect("three-part token");
    let (_, signature) = other.rsplit_once('.').expect("three-part token");
    format!("{head}.{signature}")
}

/// IdP stub serving the test JWKS.
pub async fn jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&test_keys().jwks))
        .mount(&server)
        .await;
    server
}

/// IdP stub that must be hit exactly `times` times before it is dropped.
pub async fn counted_jwks_server(times: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&test_keys().jwks))
        .expect(times)
        .mount(&server)
        .await;
    server
}
