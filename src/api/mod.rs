// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{DenyMode, IdentityClaims},
    error::ErrorBody,
    rate_limit::rate_limit,
    sheets::{DataSource, SheetRow, SheetSnapshot, SheetStats},
    state::AppState,
};

pub mod access;
pub mod content;
pub mod health;
pub mod sheets;

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

pub fn router(state: AppState) -> Router {
    // Rate limited, bearer token required.
    let protected_routes = Router::new()
        .route("/content", get(content::get_content).options(preflight))
        .route(
            "/content/{*path}",
            get(content::get_document).options(preflight),
        )
        .route("/sheet", get(sheets::get_sheet).options(preflight))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let v1_routes = Router::new()
        .merge(protected_routes)
        .route(
            "/access/decision",
            post(access::access_decision).options(preflight),
        )
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state.clone());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id,
            )
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(build_cors_layer(&state.config.allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace_layer)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Plain `OPTIONS` without preflight headers: 200 with no body.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(CORS_MAX_AGE);

    if allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: allowing any origin");
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::error!("CORS: No valid origins configured, denying cross-origin requests");
        layer.allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        layer.allow_origin(origins)
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        content::get_content,
        content::get_document,
        sheets::get_sheet,
        access::access_decision,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            content::ContentResponse,
            content::ContentUser,
            content::ContentIndexEntry,
            content::DocumentResponse,
            content::DocumentMetadata,
            SheetSnapshot,
            SheetRow,
            SheetStats,
            DataSource,
            access::AccessDecisionRequest,
            access::AccessDecisionResponse,
            DenyMode,
            IdentityClaims,
            ErrorBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Content", description = "Token-protected content"),
        (name = "Sheets", description = "Spreadsheet proxy"),
        (name = "Access", description = "Login allow-list decisions"),
        (name = "Health", description = "Liveness and readiness checks")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::{counted_jwks_server, jwks_server, sign, test_claims, JWKS_PATH, TEST_DOMAIN};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn config_with_idp(jwks_base: &str) -> Config {
        let mut config = Config::default();
        config.auth0_domain = Some(TEST_DOMAIN.into());
        config.jwks_url = Some(format!("{jwks_base}{JWKS_PATH}"));
        config
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_accept(uri: &str, token: &str, accept: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Content root holding `guide.md`, with `secret.md` beside it.
    fn content_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("content");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("guide.md"), "# Guide\n\nWelcome *in*.\n").unwrap();
        std::fs::write(dir.path().join("secret.md"), "top secret").unwrap();
        dir
    }

    fn content_app(fixture: &TempDir, jwks_base: &str) -> Router {
        let mut config = config_with_idp(jwks_base);
        config.content_dir = fixture.path().join("content");
        router(AppState::new(config))
    }

    async fn body_bytes(response: axum::response::Response) -> axum::body::Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn missing_header_is_header_invalid() {
        let app = router(AppState::default());
        let response = app.oneshot(get_with_token("/v1/content", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "header_invalid");
    }

    #[tokio::test]
    async fn bad_header_never_fetches_keys() {
        let server = counted_jwks_server(0).await;
        let app = router(AppState::new(config_with_idp(&server.uri())));

        let bare = app
            .clone()
            .oneshot(get_with_token("/v1/content", None))
            .await
            .unwrap();
        assert_eq!(bare.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(bare).await["error"], "header_invalid");

        let basic = app
            .oneshot(
                Request::builder()
                    .uri("/v1/content")
                    .header(header::AUTHORIZATION, "Basic x")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(basic.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(basic).await["error"], "header_invalid");

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_domain_is_server_error() {
        let app = router(AppState::default());
        let response = app
            .oneshot(get_with_token("/v1/content", Some("abc.def.ghi")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "server_error");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let server = jwks_server().await;
        let app = router(AppState::new(config_with_idp(&server.uri())));

        let mut claims = test_claims();
        claims["exp"] = (chrono::Utc::now().timestamp() - 10).into();
        let response = app
            .oneshot(get_with_token("/v1/content", Some(&sign(&claims))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "token_expired");
    }

    #[tokio::test]
    async fn repeated_token_gets_identical_cached_body() {
        let server = counted_jwks_server(1).await;
        let app = router(AppState::new(config_with_idp(&server.uri())));
        let token = sign(&test_claims());

        let first = app
            .clone()
            .oneshot(get_with_token("/v1/content", Some(&token)))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[content::X_CACHE], "MISS");
        let first_body = body_bytes(first).await;

        let second = app
            .oneshot(get_with_token("/v1/content", Some(&token)))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()[content::X_CACHE], "HIT");
        assert_eq!(body_bytes(second).await, first_body);

        let json: Value = serde_json::from_slice(&first_body).unwrap();
        assert_eq!(json["user"]["email"], "partner@gmail.com");
    }

    #[tokio::test]
    async fn content_index_lists_documents() {
        let fixture = content_fixture();
        let server = jwks_server().await;
        let app = content_app(&fixture, &server.uri());

        let response = app
            .oneshot(get_with_token("/v1/content", Some(&sign(&test_claims()))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["documents"][0]["path"], "guide");
        assert_eq!(json["documents"].as_array().unwrap().len(), 1);
        assert_eq!(json["user"]["permissions"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn document_as_json_includes_html_metadata_and_user() {
        let fixture = content_fixture();
        let server = jwks_server().await;
        let app = content_app(&fixture, &server.uri());

        let mut claims = test_claims();
        claims["permissions"] = serde_json::json!(["read:content"]);
        claims["scope"] = "openid email".into();
        let response = app
            .oneshot(get_with_accept(
                "/v1/content/guide",
                &sign(&claims),
                Some("application/json"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        let json = body_json(response).await;
        assert_eq!(json["markdown"], "# Guide\n\nWelcome *in*.\n");
        assert!(json["html"].as_str().unwrap().contains("<em>in</em>"));
        assert_eq!(json["metadata"]["filename"], "guide.md");
        assert_eq!(json["metadata"]["extension"], ".md");
        assert!(json["metadata"]["lastModified"].is_string());
        assert_eq!(json["user"]["email"], "partner@gmail.com");
        assert_eq!(json["user"]["permissions"], serde_json::json!(["read:content"]));
        assert_eq!(json["user"]["scope"], "openid email");
    }

    #[tokio::test]
    async fn document_as_markdown_is_raw_source() {
        let fixture = content_fixture();
        let server = jwks_server().await;
        let app = content_app(&fixture, &server.uri());

        let response = app
            .oneshot(get_with_accept(
                "/v1/content/guide.md",
                &sign(&test_claims()),
                Some("text/markdown"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/markdown; charset=utf-8"
        );
        assert_eq!(body_bytes(response).await, "# Guide\n\nWelcome *in*.\n");
    }

    #[tokio::test]
    async fn document_defaults_to_html() {
        let fixture = content_fixture();
        let server = jwks_server().await;
        let app = content_app(&fixture, &server.uri());

        let response = app
            .oneshot(get_with_accept("/v1/content/guide", &sign(&test_claims()), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let html = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
        assert!(html.contains("<h1>Guide</h1>"));
    }

    #[tokio::test]
    async fn document_path_traversal_is_forbidden() {
        let fixture = content_fixture();
        let server = jwks_server().await;
        let app = content_app(&fixture, &server.uri());
        let token = sign(&test_claims());

        for uri in ["/v1/content/../secret.md", "/v1/content/%2E%2E%2Fsecret.md"] {
            let response = app
                .clone()
                .oneshot(get_with_accept(uri, &token, Some("text/markdown")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body_json(response).await["error"], "forbidden");
        }
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let fixture = content_fixture();
        let server = jwks_server().await;
        let app = content_app(&fixture, &server.uri());

        let response = app
            .oneshot(get_with_accept(
                "/v1/content/absent",
                &sign(&test_claims()),
                Some("application/json"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "not_found");
    }

    #[tokio::test]
    async fn document_requires_bearer_token() {
        let fixture = content_fixture();
        let server = counted_jwks_server(0).await;
        let app = content_app(&fixture, &server.uri());

        let response = app
            .oneshot(get_with_token("/v1/content/guide", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "header_invalid");
    }

    #[tokio::test]
    async fn sheet_without_api_key_serves_example_data() {
        let server = jwks_server().await;
        let app = router(AppState::new(config_with_idp(&server.uri())));

        let response = app
            .oneshot(get_with_token("/v1/sheet", Some(&sign(&test_claims()))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["dataSource"], "Example Data");
        assert!(json["fallbackReason"].is_string());
        assert!(json["total"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn failing_upstream_serves_example_data_with_500() {
        let idp = jwks_server().await;
        let sheetbest = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&sheetbest)
            .await;

        let mut config = config_with_idp(&idp.uri());
        config.sheets.api_key = Some("key".into());
        config.sheets.sheet_id = Some("sheet-1".into());
        config.sheets.base_url = sheetbest.uri();
        let app = router(AppState::new(config));

        let response = app
            .oneshot(get_with_token("/v1/sheet", Some(&sign(&test_claims()))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["dataSource"], "Example Data");
        assert_eq!(json["fallbackReason"], "SheetBest answered HTTP 503");
        assert!(!json["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_email_is_allowed() {
        let mut config = Config::default();
        config.access.allowed_emails = vec!["partner@gmail.com".into()];
        let app = router(AppState::new(config));

        let response = app
            .oneshot(post_json(
                "/v1/access/decision",
                serde_json::json!({"email": "partner@gmail.com"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"allowed": true}));
    }

    #[tokio::test]
    async fn unknown_email_is_redirected_to_forbidden_page() {
        let mut config = Config::default();
        config.access.allowed_emails = vec!["partner@gmail.com".into()];
        let app = router(AppState::new(config));

        let response = app
            .oneshot(post_json(
                "/v1/access/decision",
                serde_json::json!({"email": "someone@unrelated.com"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"allowed": false, "redirectTo": "/forbidden.html"})
        );
    }

    #[tokio::test]
    async fn reject_mode_answers_forbidden() {
        let mut config = Config::default();
        config.access.deny_mode = DenyMode::Reject;
        let app = router(AppState::new(config));

        let response = app
            .oneshot(post_json(
                "/v1/access/decision",
                serde_json::json!({"email": "someone@unrelated.com"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn rate_limit_applies_before_auth() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 2;
        config.rate_limit.window = Duration::from_secs(60);
        let app = router(AppState::new(config));

        for remaining in ["1", "0"] {
            let response = app
                .clone()
                .oneshot(get_with_token("/v1/sheet", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
            assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
        }

        let response = app.oneshot(get_with_token("/v1/sheet", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((59..=60).contains(&retry_after));
        let json = body_json(response).await;
        assert_eq!(json["error"], "rate_limit_exceeded");
        assert_eq!(json["retryAfter"], retry_after);
    }

    fn get_from(uri: &str, client_ip: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("client-ip", client_ip)
            .header("x-forwarded-for", client_ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn spoofed_forwarding_headers_share_one_budget() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 2;
        let app = router(AppState::new(config));

        for ip in ["203.0.113.1", "203.0.113.2"] {
            let response = app.clone().oneshot(get_from("/v1/sheet", ip)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        let response = app.oneshot(get_from("/v1/sheet", "203.0.113.3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn trusted_proxy_headers_split_budgets() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 2;
        config.rate_limit.trust_proxy_headers = true;
        let app = router(AppState::new(config));

        for ip in ["203.0.113.1", "203.0.113.2", "203.0.113.3"] {
            let response = app.clone().oneshot(get_from("/v1/sheet", ip)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()["x-ratelimit-remaining"], "1");
        }
    }

    #[tokio::test]
    async fn preflight_is_empty_ok_with_cors_headers() {
        let app = router(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/v1/content")
                    .header(header::ORIGIN, "http://localhost:8888")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:8888"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn plain_options_is_empty_ok() {
        let app = router(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/v1/sheet")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn responses_carry_security_headers_and_request_id() {
        let app = router(AppState::default());
        let response = app
            .oneshot(get_with_token("/health/live", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/content",
            "/v1/content/{path}",
            "/v1/sheet",
            "/v1/access/decision",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
